//! Offline symbol directory for ticker search.

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolDirectory {
    entries: Vec<SymbolInfo>,
}

impl SymbolDirectory {
    /// Symbols are uppercased and trimmed; blank and repeated symbols are skipped.
    pub fn new(entries: impl IntoIterator<Item = SymbolInfo>) -> Self {
        let mut entries: Vec<SymbolInfo> = entries
            .into_iter()
            .map(|e| SymbolInfo {
                symbol: e.symbol.trim().to_uppercase(),
                name: e.name.trim().to_string(),
            })
            .filter(|e| !e.symbol.is_empty())
            .collect();
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        entries.dedup_by(|a, b| a.symbol == b.symbol);
        SymbolDirectory { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive prefix search: symbol matches first, then name matches.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SymbolInfo> {
        let q = query.trim().to_uppercase();
        if q.is_empty() {
            return Vec::new();
        }
        let by_symbol = self.entries.iter().filter(|e| e.symbol.starts_with(&q));
        let by_name = self
            .entries
            .iter()
            .filter(|e| !e.symbol.starts_with(&q) && e.name.to_uppercase().starts_with(&q));
        by_symbol.chain(by_name).take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(symbol: &str, name: &str) -> SymbolInfo {
        SymbolInfo {
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    fn directory() -> SymbolDirectory {
        SymbolDirectory::new(vec![
            info("msft", "Microsoft Corp"),
            info("AAPL", "Apple Inc"),
            info("AMZN", "Amazon.com Inc"),
            info("AA", "Alcoa Corp"),
            info("MU", "Micron Technology"),
            info("AAPL", "duplicate"),
            info("  ", "blank"),
        ])
    }

    #[test]
    fn normalises_and_dedupes() {
        let d = directory();
        assert_eq!(d.len(), 5);
        assert_eq!(d.search("aapl", 20), vec![info("AAPL", "Apple Inc")]);
    }

    #[test]
    fn symbol_prefix_then_name_prefix() {
        let d = directory();
        let hits: Vec<String> = d.search("mi", 20).into_iter().map(|s| s.symbol).collect();
        assert_eq!(hits, vec!["MSFT", "MU"]);
        let hits: Vec<String> = d.search("a", 20).into_iter().map(|s| s.symbol).collect();
        assert_eq!(hits, vec!["AA", "AAPL", "AMZN"]);
    }

    #[test]
    fn respects_limit_and_blank_query() {
        let d = directory();
        assert_eq!(d.search("A", 2).len(), 2);
        assert!(d.search("   ", 20).is_empty());
    }
}
