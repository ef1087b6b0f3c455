use serde_json::{Map, Value};

pub fn choice_prompt(question: &str, allow: &[String]) -> String {
    let allow_text = allow
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let mut text = String::new();
    text.push_str("You map raw datasheet strings to canonical schema keys.\n\n");
    text.push_str(question);
    text.push_str("\n\nChoose ONE from this list only: [");
    text.push_str(&allow_text);
    text.push_str("]. If nothing fits, reply with \"NONE\".\n");
    text.push_str("Respond ONLY with JSON: {\"choice\": \"<value>|NONE\"}\n");
    text
}

pub fn entity_question(table_name: &str, sample_rows: &[Map<String, Value>]) -> String {
    let rows = serde_json::to_string_pretty(sample_rows).unwrap_or_else(|_| "[]".to_string());
    format!("Table name: {table_name}\nFirst rows: {rows}\n\nWhich schema entity does this table describe?")
}

pub fn property_question(raw: &str, entity: &str) -> String {
    format!("Canonical property for header '{raw}' in entity '{entity}'")
}

pub fn enriched_property_question(raw: &str, entity: &str, context: &str) -> String {
    format!("Header '{raw}' context:\n{context}\nWhich property in '{entity}' fits?")
}

pub fn context_query(raw: &str, hint: &str) -> String {
    format!("{raw} {hint}").trim().to_string()
}
