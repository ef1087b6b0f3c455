use tracing::debug;

use crate::align::similarity::{best_candidate, similarity, MatchCandidate};
use crate::core::{
    config::AlignerConfig,
    errors::AppResult,
    types::{BoundingBox, OcrToken, PropertyEntry, Rect},
};

#[derive(Debug, Clone)]
pub struct BoundingBoxAligner {
    config: AlignerConfig,
}

impl Default for BoundingBoxAligner {
    fn default() -> Self {
        Self::new(AlignerConfig::default())
    }
}

impl BoundingBoxAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Returns `properties` with both bounding boxes populated on every entry.
    pub fn align(
        &self,
        tokens: &[OcrToken],
        properties: Vec<PropertyEntry>,
    ) -> AppResult<Vec<PropertyEntry>> {
        for token in tokens {
            token.validate()?;
        }

        let aligned = properties
            .into_iter()
            .map(|mut entry| {
                self.align_entry(tokens, &mut entry);
                entry
            })
            .collect::<Vec<_>>();

        let located = aligned
            .iter()
            .filter(|entry| {
                entry
                    .property_name_bbox
                    .map(|bbox| !bbox.is_empty())
                    .unwrap_or(false)
            })
            .count();
        debug!(
            properties = aligned.len(),
            located,
            tokens = tokens.len(),
            "aligned property bounding boxes"
        );
        Ok(aligned)
    }

    pub fn align_entry(&self, tokens: &[OcrToken], entry: &mut PropertyEntry) {
        let Some(name_match) = self.match_name(tokens, &entry.section, &entry.property_name)
        else {
            entry.property_name_bbox = Some(BoundingBox::EMPTY);
            entry.property_value_bbox = Some(BoundingBox::EMPTY);
            return;
        };

        let name_rect = tokens[name_match.index].rect();
        entry.property_name_bbox = Some(BoundingBox::new(name_rect));
        entry.property_value_bbox = Some(
            self.match_value(tokens, &name_rect, &entry.value_text())
                .map(|found| BoundingBox::new(tokens[found.index].rect()))
                .unwrap_or(BoundingBox::EMPTY),
        );
    }

    /// Best token for a property name within `section`.
    ///
    /// The first token whose text contains the name wins outright with score
    /// 100; otherwise the highest scoring token at or above the threshold.
    pub fn match_name(
        &self,
        tokens: &[OcrToken],
        section: &str,
        name: &str,
    ) -> Option<MatchCandidate> {
        let needle = name.to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let in_section = || {
            tokens
                .iter()
                .enumerate()
                .filter(move |(_, token)| token.section == section && !token.word.is_empty())
        };

        if let Some((index, _)) =
            in_section().find(|(_, token)| token.word.to_lowercase().contains(&needle))
        {
            return Some(MatchCandidate {
                index,
                score: 100,
                gap: 0.0,
            });
        }

        best_candidate(in_section().filter_map(|(index, token)| {
            let score = similarity(&needle, &token.word);
            (score >= self.config.threshold).then_some(MatchCandidate {
                index,
                score,
                gap: 0.0,
            })
        }))
    }

    /// Best token for a property value inside the band around `name_rect`.
    pub fn match_value(
        &self,
        tokens: &[OcrToken],
        name_rect: &Rect,
        value: &str,
    ) -> Option<MatchCandidate> {
        if value.is_empty() {
            return None;
        }
        // Both band edges hang off the name's top edge.
        let anchor = name_rect.y_min;
        let lower = anchor - self.config.value_window;
        let upper = anchor + self.config.value_window;

        best_candidate(tokens.iter().enumerate().filter_map(|(index, token)| {
            if token.word.is_empty() || token.y_min < lower || token.y_min > upper {
                return None;
            }
            let score = similarity(value, &token.word);
            (score >= self.config.threshold).then_some(MatchCandidate {
                index,
                score,
                gap: (anchor - token.y_min).abs(),
            })
        }))
    }
}
