use crate::select::DEFAULT_MAX_DEPTH;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

macro_rules! create_options_structs {
    (
        $(
            $(#[$meta:meta])*
            clap $clap:tt
            pub $name:ident : $ty:ty
        ),* $(,)?
    ) => {
        #[derive(Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Parser)]
        #[command(version, about, long_about = None)]
        #[doc(hidden)]
        pub struct CliOptions {
            $(
            $(#[$meta])*
            #[arg$clap]
            pub(crate) $name: $ty,
            )*

            // clap-only stuff:

            /// Keep parents whose children were all removed. Only valid with --mode reject or --mode filter.
            #[arg(long)]
            pub(crate) no_cascade: bool,

            /// The selector string
            #[arg(value_name = "SELECTOR")]
            pub(crate) selector: String,

            /// An optional list of files to read, by path. If not provided, standard input will be used.
            ///
            /// Markdown files are concatenated and read as a single document. JSON files are each read as a separate
            /// tree, and their results are concatenated.
            ///
            /// A path of "-" represents standard input. All but the first "-" are ignored.
            #[arg(value_name = "FILES")]
            pub(crate) file_paths: Vec<String>,
        }

        /// Options analogous to the treeq CLI's switches.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Builder)]
        #[builder(default)]
        pub struct RunOptions {
            $(
            $(#[$meta])*
            pub $name: $ty,
            )*

            /// Whether `reject` and `filter` remove parents whose children were all removed. This is the inverse of
            /// the `--no-cascade` option in the CLI arguments.
            pub cascade: bool,

            pub selector: String,

            pub file_paths: Vec<String>,
        }

        impl From<CliOptions> for RunOptions {
            fn from(value: CliOptions) -> Self {
                Self {
                    $($name: value.$name,)*
                    cascade: !value.no_cascade,
                    selector: value.selector,
                    file_paths: value.file_paths,
                }
            }
        }
    };
}

create_options_structs! {
    /// How to read the input files.
    clap(long, short, value_enum, default_value_t = InputFormat::Markdown)
    pub input: InputFormat,

    /// What to do with the nodes the selector matches.
    clap(long, short, value_enum, default_value_t = Mode::All)
    pub mode: Mode,

    /// Specifies the output format for matched nodes (or, for reject and filter, the resulting trees).
    clap(long, short, value_enum, default_value_t = OutputFormat::Json)
    pub output: OutputFormat,

    /// How many levels deep to search before giving up with an error.
    clap(long, default_value_t = DEFAULT_MAX_DEPTH)
    pub max_depth: usize,

    /// Binds a `$NAME` in the selector to a value. Can be repeated.
    ///
    /// Substitutions are only parsed when at least one is given; otherwise `$` is an ordinary character.
    clap(long = "var", value_name = "NAME=VALUE")
    pub substitutions: Vec<String>,

    /// Quiet: do not print anything to stdout. The exit code will still be 0 if any nodes match, and non-0 if none do.
    clap(long, short)
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            input: InputFormat::Markdown,
            mode: Mode::All,
            output: OutputFormat::Json,
            max_depth: DEFAULT_MAX_DEPTH,
            substitutions: Vec::new(),
            quiet: false,
            cascade: true,
            selector: String::new(),
            file_paths: Vec::new(),
        }
    }
}

impl RunOptions {
    /// The `--var` bindings, split into names and values. Entries without an `=` are skipped; the CLI rejects them
    /// up front.
    pub fn substitution_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.substitutions.iter().filter_map(|binding| binding.split_once('='))
    }
}

impl CliOptions {
    pub fn extra_validation(&self) -> bool {
        if self.no_cascade && !matches!(self.mode, Mode::Reject | Mode::Filter) {
            let _ = CliOptions::command()
                .error(
                    ErrorKind::ArgumentConflict,
                    format!("--no-cascade can't be used with --mode {}", self.mode),
                )
                .print();
            return false;
        }
        if let Some(bad) = self.substitutions.iter().find(|binding| !binding.contains('=')) {
            let _ = CliOptions::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("invalid --var {bad:?}; expected NAME=VALUE"),
                )
                .print();
            return false;
        }
        true
    }
}

/// Input formats, analogous to `--input` in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum InputFormat {
    /// GitHub-flavored Markdown, read into an mdast-style tree.
    #[default]
    Markdown,

    /// A unist-style JSON tree: `{"type": ..., "children": [...], ...}`.
    Json,
}

/// What to do with matched nodes, analogous to `--mode` in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Mode {
    /// Output every matching node, in document order.
    #[default]
    All,

    /// Output only the first matching node.
    First,

    /// Output the tree with every matching node removed.
    Reject,

    /// Output the tree with only the matching nodes kept. A node that doesn't match is removed along with its
    /// subtree, so this usually wants a selector list that also covers the ancestors, like `root, list, listItem`.
    Filter,

    /// Don't read any input; just print the selector in its canonical form.
    Render,
}

/// Output formats, analogous to `--output` in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum OutputFormat {
    /// A JSON array of nodes.
    #[default]
    Json,

    /// Each node's text content, one per line.
    Text,

    /// Each node's type, one per line.
    Type,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            Mode::All => "all",
            Mode::First => "first",
            Mode::Reject => "reject",
            Mode::Filter => "filter",
            Mode::Render => "render",
        };
        f.write_str(self_str)
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::Type => "type",
        };
        f.write_str(self_str)
    }
}
