use std::fmt::Write;

use anyhow::Result;
use connect_common::{ConnectId, PairKey};
use match_engine::db_types::{ActionLedgerRecord, QueuedCandidate};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

pub fn format_candidates(candidates: &[QueuedCandidate]) -> String {
    if candidates.is_empty() {
        return "Nothing left to show".to_string();
    }
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Date", "Peer", "Score", "Rank"]);
    candidates.iter().for_each(|c| {
        table.add_row(row![
            c.entry_date.to_string(),
            c.peer_id,
            format!("{:.3}", c.compatibility_score),
            c.stability_rank.to_string()
        ]);
    });
    table.to_string()
}

fn join(ids: &std::collections::BTreeSet<ConnectId>) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}

pub fn format_ledger(record: &ActionLedgerRecord) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Ledger for {}. Last updated {}", record.user_id, record.last_updated)?;
    writeln!(f, "===============================================================================")?;
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Relation", "Count", "Peers"]);
    table.add_row(row!["Likes", record.likes.len().to_string(), join(&record.likes)]);
    table.add_row(row!["Passes", record.passes.len().to_string(), join(&record.passes)]);
    table.add_row(row!["Liked by", record.liked_by.len().to_string(), join(&record.liked_by)]);
    table.add_row(row!["Matches", record.matches.len().to_string(), join(&record.matches)]);
    write!(f, "{table}")?;
    Ok(f)
}

pub fn format_inconsistent_pairs(pairs: &[PairKey]) -> String {
    if pairs.is_empty() {
        return "Every match has a conversation, and every conversation has a match".to_string();
    }
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Inconsistent pair"]);
    pairs.iter().for_each(|p| {
        table.add_row(row![p]);
    });
    table.to_string()
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    #[test]
    fn empty_outputs() {
        assert_eq!(format_candidates(&[]), "Nothing left to show");
        assert!(format_inconsistent_pairs(&[]).starts_with("Every match"));
    }

    #[test]
    fn ledger_lists_peers() {
        let mut record = ActionLedgerRecord::new("alice".into(), Utc::now());
        record.likes.insert("bob".into());
        record.likes.insert("carol".into());
        record.matches.insert("bob".into());
        let out = format_ledger(&record).unwrap();
        assert!(out.contains("Ledger for alice"));
        assert!(out.contains("bob, carol"));
    }
}
