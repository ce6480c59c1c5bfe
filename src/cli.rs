use clap::{Parser, Subcommand};

use crate::catalog::Locale;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Search language (en, ja). Defaults to the configured locale.
    #[clap(short, long, global = true, value_parser = parse_locale)]
    pub locale: Option<Locale>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search cards with natural language
    Search {
        /// Query text
        #[clap(required = true)]
        query: Vec<String>,

        /// Structured filters as JSON, skipping the query parser.
        /// The query text becomes the semantic query.
        #[clap(short, long)]
        filters: Option<String>,

        /// Don't call the language model (parser, embeddings, answer)
        #[clap(long, default_value = "false")]
        no_llm: bool,

        /// Maximum number of results
        #[clap(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Load the embedding table for the locale and report its size
    Warm {},
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    value.parse().map_err(|e| format!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let args = Args::parse_from([
            "cardex", "--locale", "ja", "search", "sleepy", "water", "-n", "3",
        ]);
        assert_eq!(args.locale, Some(Locale::Ja));
        match args.command {
            Command::Search {
                query,
                filters,
                no_llm,
                limit,
            } => {
                assert_eq!(query, vec!["sleepy", "water"]);
                assert!(filters.is_none());
                assert!(!no_llm);
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_locale_after_subcommand() {
        let args = Args::parse_from(["cardex", "warm", "--locale", "en"]);
        assert_eq!(args.locale, Some(Locale::En));
        assert!(matches!(args.command, Command::Warm {}));
    }

    #[test]
    fn test_rejects_unknown_locale() {
        assert!(Args::try_parse_from(["cardex", "--locale", "fr", "warm"]).is_err());
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Args::try_parse_from(["cardex", "search"]).is_err());
    }
}
