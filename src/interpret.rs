//! Rule-Based Command Interpreter
//!
//! A pure function from free-form text to a structured [`Command`], or to
//! nothing at all. The interpreter trades recall for simplicity: when a
//! required argument cannot be extracted it returns no match rather than
//! guessing, pushing disambiguation back to the caller.
//!
//! # Matching Model
//! The input is matched against an ORDERED list of rule groups; the first
//! group that both matches its keywords and extracts all required arguments
//! wins. A group whose keywords match but whose extraction comes up short
//! falls through to the next group. Matching runs over an ASCII-lowercased
//! copy of the input; the `Name` payload is sliced out of the original text
//! so user casing survives (`to_ascii_lowercase` keeps byte offsets
//! identical between the two).
//!
//! # Table Gazetteer
//! Table names are recognized by substring against an explicit ordered
//! priority table. First match in enumeration order wins, which makes the
//! tie-break policy for overlapping names ("invoice" vs "invoiceline") an
//! auditable constant rather than an accident.

use crate::store::Record;

/// Default window size the interpreter picks for conversational scans.
///
/// Narrower than the engine-side [`crate::engine::DEFAULT_SCAN_LIMIT`]; the
/// two defaults are deliberately separate constants.
pub const CONVERSATIONAL_LIMIT: i64 = 10;

/// Recognized table names: (lowercase pattern, canonical store name).
///
/// Enumeration order is the tie-break policy. "invoice" precedes
/// "invoiceline" and "playlist" precedes "playlisttrack", so free text
/// naming the longer table resolves to the earlier entry.
pub const TABLE_GAZETTEER: &[(&str, &str)] = &[
    ("album", "Album"),
    ("artist", "Artist"),
    ("customer", "Customer"),
    ("employee", "Employee"),
    ("genre", "Genre"),
    ("invoice", "Invoice"),
    ("invoiceline", "InvoiceLine"),
    ("mediatype", "MediaType"),
    ("playlist", "Playlist"),
    ("playlisttrack", "PlaylistTrack"),
    ("track", "Track"),
];

/// A fully-extracted operation with its typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListTables,
    GetAllRecords { table_name: String, limit: i64, offset: i64 },
    GetRecord { table_name: String, record_id: i64 },
    CreateRecord { table_name: String, data: Record },
    UpdateRecord { table_name: String, record_id: i64, data: Record },
    DeleteRecord { table_name: String, record_id: i64 },
}

impl Command {
    /// The operation name this command dispatches to
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::ListTables => "list_tables",
            Self::GetAllRecords { .. } => "get_all_records",
            Self::GetRecord { .. } => "get_record",
            Self::CreateRecord { .. } => "create_record",
            Self::UpdateRecord { .. } => "update_record",
            Self::DeleteRecord { .. } => "delete_record",
        }
    }

    /// The extracted arguments as a JSON object (for display and logging)
    #[must_use]
    pub fn args(&self) -> serde_json::Value {
        match self {
            Self::ListTables => serde_json::json!({}),
            Self::GetAllRecords { table_name, limit, offset } => {
                serde_json::json!({ "table_name": table_name, "limit": limit, "offset": offset })
            }
            Self::GetRecord { table_name, record_id } => {
                serde_json::json!({ "table_name": table_name, "record_id": record_id })
            }
            Self::CreateRecord { table_name, data } => {
                serde_json::json!({ "table_name": table_name, "data": data })
            }
            Self::UpdateRecord { table_name, record_id, data } => {
                serde_json::json!({ "table_name": table_name, "record_id": record_id, "data": data })
            }
            Self::DeleteRecord { table_name, record_id } => {
                serde_json::json!({ "table_name": table_name, "record_id": record_id })
            }
        }
    }
}

/// One rule group: keyword predicate + argument extractor.
/// Receives (original text, lowered text, available operations).
type RuleGroup = fn(&str, &str, &[&str]) -> Option<Command>;

/// Rule groups in priority order; the first full match wins.
const RULE_GROUPS: &[RuleGroup] = &[
    match_list_tables,
    match_get_all_records,
    match_get_record,
    match_create_record,
    match_update_record,
    match_delete_record,
];

/// Interpret an utterance against the operations currently available
///
/// Pure and stateless; safe to call concurrently. Returns `None` when no
/// rule group produces a complete command — the caller should ask the user
/// to rephrase rather than guess.
pub fn interpret(text: &str, available: &[&str]) -> Option<Command> {
    let lowered = text.to_ascii_lowercase();
    let command = RULE_GROUPS.iter().find_map(|rule| rule(text, &lowered, available));
    match &command {
        Some(cmd) => tracing::debug!(operation = cmd.operation(), "interpreted utterance"),
        None => tracing::debug!("no rule group matched utterance"),
    }
    command
}

fn is_available(available: &[&str], operation: &str) -> bool {
    available.contains(&operation)
}

/// Group 1: "list tables" / "show tables". No arguments.
fn match_list_tables(_raw: &str, lowered: &str, _available: &[&str]) -> Option<Command> {
    if lowered.contains("list tables") || lowered.contains("show tables") {
        Some(Command::ListTables)
    } else {
        None
    }
}

/// Group 2: "all" + ("records" | "rows"), table required, optional limit.
fn match_get_all_records(_raw: &str, lowered: &str, available: &[&str]) -> Option<Command> {
    if !(lowered.contains("all") && (lowered.contains("records") || lowered.contains("rows"))) {
        return None;
    }
    if !is_available(available, "get_all_records") {
        return None;
    }

    let table_name = find_table(lowered)?;
    Some(Command::GetAllRecords {
        table_name: table_name.to_string(),
        limit: parse_limit(lowered),
        offset: 0,
    })
}

/// Group 3: "get" + "record" + "id", table and id both required.
fn match_get_record(_raw: &str, lowered: &str, available: &[&str]) -> Option<Command> {
    if !(lowered.contains("get") && lowered.contains("record") && lowered.contains("id")) {
        return None;
    }
    if !is_available(available, "get_record") {
        return None;
    }

    let table_name = find_table(lowered)?;
    let record_id = parse_record_id(lowered)?;
    Some(Command::GetRecord { table_name: table_name.to_string(), record_id })
}

/// Group 4: ("create" | "add") + "record", table and a Name field required.
fn match_create_record(raw: &str, lowered: &str, available: &[&str]) -> Option<Command> {
    if !((lowered.contains("create") || lowered.contains("add")) && lowered.contains("record")) {
        return None;
    }
    if !is_available(available, "create_record") {
        return None;
    }

    let table_name = find_table(lowered)?;
    let data = extract_name_data(raw, lowered)?;
    Some(Command::CreateRecord { table_name: table_name.to_string(), data })
}

/// Group 5: "update" + "record", table, id and a Name field ALL required.
fn match_update_record(raw: &str, lowered: &str, available: &[&str]) -> Option<Command> {
    if !(lowered.contains("update") && lowered.contains("record")) {
        return None;
    }
    if !is_available(available, "update_record") {
        return None;
    }

    let table_name = find_table(lowered)?;
    let record_id = parse_record_id(lowered)?;
    let data = extract_name_data(raw, lowered)?;
    Some(Command::UpdateRecord { table_name: table_name.to_string(), record_id, data })
}

/// Group 6: ("delete" | "remove") + "record", table and id both required.
fn match_delete_record(_raw: &str, lowered: &str, available: &[&str]) -> Option<Command> {
    if !((lowered.contains("delete") || lowered.contains("remove")) && lowered.contains("record")) {
        return None;
    }
    if !is_available(available, "delete_record") {
        return None;
    }

    let table_name = find_table(lowered)?;
    let record_id = parse_record_id(lowered)?;
    Some(Command::DeleteRecord { table_name: table_name.to_string(), record_id })
}

/// First gazetteer entry whose pattern occurs anywhere in the text
fn find_table(lowered: &str) -> Option<&'static str> {
    TABLE_GAZETTEER.iter().find(|entry| lowered.contains(entry.0)).map(|entry| entry.1)
}

/// Integer token following the token "limit"; falls back to the
/// conversational default on absence or parse failure
fn parse_limit(lowered: &str) -> i64 {
    let Some(pos) = lowered.find("limit") else {
        return CONVERSATIONAL_LIMIT;
    };
    lowered[pos..]
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.parse().ok())
        .unwrap_or(CONVERSATIONAL_LIMIT)
}

/// First purely-numeric whitespace-delimited token at or after the literal "id"
fn parse_record_id(lowered: &str) -> Option<i64> {
    let pos = lowered.find("id")?;
    lowered[pos..]
        .split_whitespace()
        .find(|token| token.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|token| token.parse().ok())
}

/// Extract the single supported key/value pair: everything after the first
/// ':' following "name", trimmed and stripped of one layer of matching
/// quotes, bound to column `Name`.
///
/// The value is sliced from the original text so its casing is preserved.
fn extract_name_data(raw: &str, lowered: &str) -> Option<Record> {
    let pos = lowered.find("name")?;
    let rest = &raw[pos..];
    let colon = rest.find(':')?;
    let value = strip_matching_quotes(rest[colon + 1..].trim());

    let mut data = Record::new();
    data.insert("Name".to_string(), serde_json::Value::String(value.to_string()));
    Some(data)
}

/// Strip a single layer of matching surrounding quote characters
fn strip_matching_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPS: &[&str] =
        &["list_tables", "get_all_records", "get_record", "create_record", "update_record", "delete_record"];

    #[test]
    fn test_find_table_enumeration_order() {
        assert_eq!(find_table("show me the artist table"), Some("Artist"));
        // "invoiceline" contains "invoice", which enumerates first
        assert_eq!(find_table("records from invoiceline"), Some("Invoice"));
        // "playlisttrack" contains "playlist", which enumerates first
        assert_eq!(find_table("records from playlisttrack"), Some("Playlist"));
        assert_eq!(find_table("no table here"), None);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("get all records from artist limit 5"), 5);
        assert_eq!(parse_limit("get all records from artist"), CONVERSATIONAL_LIMIT);
        assert_eq!(parse_limit("get all records limit five"), CONVERSATIONAL_LIMIT);
        assert_eq!(parse_limit("get all records limit"), CONVERSATIONAL_LIMIT);
    }

    #[test]
    fn test_parse_record_id() {
        assert_eq!(parse_record_id("get record from artist with id 1"), Some(1));
        assert_eq!(parse_record_id("get record with id: 42"), Some(42));
        assert_eq!(parse_record_id("get record with id"), None);
        assert_eq!(parse_record_id("get record from artist"), None);
    }

    #[test]
    fn test_strip_matching_quotes() {
        assert_eq!(strip_matching_quotes("'New Artist'"), "New Artist");
        assert_eq!(strip_matching_quotes("\"New Artist\""), "New Artist");
        // only one layer, and only matching pairs
        assert_eq!(strip_matching_quotes("''x''"), "'x'");
        assert_eq!(strip_matching_quotes("'mismatched\""), "'mismatched\"");
        assert_eq!(strip_matching_quotes("plain"), "plain");
        assert_eq!(strip_matching_quotes("'"), "'");
    }

    #[test]
    fn test_list_tables_scenarios() {
        assert_eq!(interpret("list tables", ALL_OPS), Some(Command::ListTables));
        assert_eq!(interpret("Please SHOW TABLES now", ALL_OPS), Some(Command::ListTables));
    }

    #[test]
    fn test_get_all_records_scenario() {
        let command = interpret("Get all records from Artist limit 5", ALL_OPS).unwrap();
        assert_eq!(
            command,
            Command::GetAllRecords { table_name: "Artist".to_string(), limit: 5, offset: 0 }
        );
    }

    #[test]
    fn test_get_all_records_default_limit() {
        let command = interpret("show all rows of the customer table", ALL_OPS).unwrap();
        assert_eq!(
            command,
            Command::GetAllRecords {
                table_name: "Customer".to_string(),
                limit: CONVERSATIONAL_LIMIT,
                offset: 0
            }
        );
    }

    #[test]
    fn test_get_record_scenario() {
        let command = interpret("Get record from Artist with id 1", ALL_OPS).unwrap();
        assert_eq!(command, Command::GetRecord { table_name: "Artist".to_string(), record_id: 1 });
    }

    #[test]
    fn test_create_record_scenario_preserves_casing() {
        let command = interpret("Create record in Artist with name: 'New Artist'", ALL_OPS).unwrap();
        match command {
            Command::CreateRecord { table_name, data } => {
                assert_eq!(table_name, "Artist");
                assert_eq!(data["Name"], serde_json::json!("New Artist"));
            }
            other => panic!("expected create_record, got {other:?}"),
        }
    }

    #[test]
    fn test_update_record_scenario() {
        let command =
            interpret("Update record in Artist with id 1 name: 'Updated Artist'", ALL_OPS).unwrap();
        match command {
            Command::UpdateRecord { table_name, record_id, data } => {
                assert_eq!(table_name, "Artist");
                assert_eq!(record_id, 1);
                assert_eq!(data["Name"], serde_json::json!("Updated Artist"));
            }
            other => panic!("expected update_record, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_record_scenarios() {
        let command = interpret("Delete record from Artist with id 1", ALL_OPS).unwrap();
        assert_eq!(command, Command::DeleteRecord { table_name: "Artist".to_string(), record_id: 1 });

        let command = interpret("remove the record with id 7 from genre", ALL_OPS).unwrap();
        assert_eq!(command, Command::DeleteRecord { table_name: "Genre".to_string(), record_id: 7 });
    }

    #[test]
    fn test_no_match_fallback() {
        assert_eq!(interpret("banana", ALL_OPS), None);
        assert_eq!(interpret("", ALL_OPS), None);
    }

    #[test]
    fn test_partial_extraction_falls_through() {
        // keywords for get_all_records match, but no table can be extracted
        assert_eq!(interpret("get all records please", ALL_OPS), None);
        // update without a name payload never fires
        assert_eq!(interpret("update record in artist with id 1", ALL_OPS), None);
        // delete without an id never fires
        assert_eq!(interpret("delete record from artist", ALL_OPS), None);
    }

    #[test]
    fn test_unavailable_operations_no_op() {
        // list_tables fires regardless of the availability set
        assert_eq!(interpret("list tables", &[]), Some(Command::ListTables));
        // everything else requires its operation to be available
        assert_eq!(interpret("Get all records from Artist limit 5", &["list_tables"]), None);
        assert_eq!(interpret("Delete record from Artist with id 1", &["get_record"]), None);
    }

    #[test]
    fn test_rule_priority_order() {
        // contains "all"+"records" AND "get"+"record"+"id": group 2 wins
        let command = interpret("get all records from artist with id 3", ALL_OPS).unwrap();
        assert_eq!(command.operation(), "get_all_records");
    }

    #[test]
    fn test_command_operation_names() {
        assert_eq!(Command::ListTables.operation(), "list_tables");
        assert_eq!(
            Command::GetRecord { table_name: "Artist".to_string(), record_id: 1 }.operation(),
            "get_record"
        );
    }

    #[test]
    fn test_command_args_shape() {
        let command = Command::GetAllRecords { table_name: "Album".to_string(), limit: 5, offset: 0 };
        assert_eq!(
            command.args(),
            serde_json::json!({ "table_name": "Album", "limit": 5, "offset": 0 })
        );
    }
}
