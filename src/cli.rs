use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Browse Cinemeta, pick a Torrentio stream and play it, unlocked through
/// Real-Debrid when a token is configured.
#[derive(Parser, Debug)]
#[command(name = "magplay", version, about)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List top movies and series
    Popular,

    /// Search movies and series
    Search {
        /// Search query
        query: Vec<String>,
    },

    /// List seasons and episodes of a series
    Episodes {
        /// IMDB id, e.g. tt0903747
        id: String,
    },

    /// List stream candidates for a title
    Streams(TitleArgs),

    /// Resolve a stream candidate and open it in the player
    Play {
        #[command(flatten)]
        title: TitleArgs,

        /// Index of the candidate from `streams`
        #[arg(long, short = 'p', default_value_t = 0)]
        pick: usize,

        /// Print the resolved URL instead of launching the player
        #[arg(long)]
        print: bool,
    },

    /// Check configuration and connectivity
    Doctor,
}

#[derive(Args, Debug)]
pub struct TitleArgs {
    /// Media type
    #[arg(value_enum)]
    pub kind: Kind,

    /// IMDB id, e.g. tt0133093
    pub id: String,

    /// Season number (series only)
    #[arg(long, short = 's', default_value_t = 1)]
    pub season: u32,

    /// Episode number (series only)
    #[arg(long, short = 'e', default_value_t = 1)]
    pub episode: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Movie,
    Series,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Movie => "movie",
            Kind::Series => "series",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        let cli = Cli::parse_from([
            "magplay", "play", "series", "tt0903747", "-s", "2", "-e", "3", "--pick", "4",
        ]);
        match cli.command {
            Command::Play { title, pick, print } => {
                assert_eq!(title.kind, Kind::Series);
                assert_eq!(title.id, "tt0903747");
                assert_eq!((title.season, title.episode), (2, 3));
                assert_eq!(pick, 4);
                assert!(!print);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_joins_words() {
        let cli = Cli::parse_from(["magplay", "-v", "search", "the", "matrix"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Search { query } => assert_eq!(query.join(" "), "the matrix"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_streams_defaults() {
        let cli = Cli::parse_from(["magplay", "streams", "movie", "tt0133093"]);
        match cli.command {
            Command::Streams(title) => {
                assert_eq!(title.kind.as_str(), "movie");
                assert_eq!((title.season, title.episode), (1, 1));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
