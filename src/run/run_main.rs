use crate::node::{read_markdown, InvalidMarkdown, Node};
use crate::query::{ParseError, Registry, Selector};
use crate::run::cli::{InputFormat, Mode, OutputFormat};
use crate::run::RunOptions;
use crate::select::{MatchError, Query, QueryOptions};
use crate::transform;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// User provided an invalid selector string.
    ///
    /// This comes from [`Selector::parse`].
    QueryParse(QueryParseError),

    /// The selector parsed, but couldn't be compiled or run: an unknown pseudo-class, a bad `nth-*` formula, a tree
    /// that's too deep, and so on.
    Query(MatchError),

    /// The Markdown input failed to parse.
    MarkdownParse(InvalidMarkdown),

    /// A JSON input wasn't a valid tree.
    JsonParse(Input, serde_json::Error),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),

    /// Couldn't write the results.
    Output(io::Error),
}

impl std::error::Error for Error {}

/// Returned when the selector string is not valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryParseError {
    query_string: String,
    error: ParseError,
}

impl QueryParseError {
    pub fn error(&self) -> &ParseError {
        &self.error
    }
}

impl std::error::Error for QueryParseError {}

impl Display for QueryParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error.describe(&self.query_string))
    }
}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::QueryParse(err) => {
                writeln!(f, "Syntax error in selector:")?;
                writeln!(f, "{err}")
            }
            Error::Query(err) => {
                writeln!(f, "Couldn't run selector: {err}")
            }
            Error::MarkdownParse(err) => {
                writeln!(f, "Markdown parse error:")?;
                writeln!(f, "{err}")
            }
            Error::JsonParse(input, err) => {
                writeln!(f, "JSON tree error in {input}: {err}")
            }
            Error::FileReadError(file, err) => {
                if env::var("TREEQ_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
            Error::Output(err) => {
                writeln!(f, "{err} while writing output")
            }
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`] method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Read each of the given file paths to a `String`.
    ///
    /// The default implementation (which you should feel free to use) treats the file path `"-"` as stdin. The first
    /// `"-"` reads all of stdin (via [`Self::read_stdin`]), and subsequent `"-"`s get silently ignored. An empty list
    /// of paths reads just stdin.
    fn read_each(&self, file_paths: &[String]) -> Result<Vec<(Input, String)>, Error> {
        if file_paths.is_empty() {
            let contents = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
            return Ok(vec![(Input::Stdin, contents)]);
        }
        let mut all = Vec::with_capacity(file_paths.len());
        let mut have_read_stdin = false;
        for path in file_paths {
            if path == "-" {
                if !have_read_stdin {
                    let contents = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
                    all.push((Input::Stdin, contents));
                    have_read_stdin = true
                }
            } else {
                let input = Input::FilePath(path.to_string());
                let contents = self
                    .read_file(path)
                    .map_err(|err| Error::from_io_error(err, input.clone()))?;
                all.push((input, contents));
            }
        }
        Ok(all)
    }

    /// Read a slice of file paths into a single, concatenated `String`, following the same rules as
    /// [`Self::read_each`].
    fn read_all(&self, file_paths: &[String]) -> Result<String, Error> {
        let each = self.read_each(file_paths)?;
        if file_paths.is_empty() {
            return Ok(each.into_iter().map(|(_, contents)| contents).collect());
        }
        let mut contents = String::new();
        for (_, file_contents) in each {
            contents.push_str(&file_contents);
            contents.push('\n');
        }
        Ok(contents)
    }
}

/// Runs treeq end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read files into [`Node`] trees, runs the selector in
/// [`RunOptions::selector`] against them according to [`RunOptions::mode`], and then writes the results to the given
/// [`OsFacade`] in the format specified by [`RunOptions::output`].
///
/// Returns whether anything matched (or, for [`Mode::Render`], whether the selector parsed).
pub fn run(options: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(options, os) {
        Ok(ok) => ok,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(options: &RunOptions, os: &mut impl OsFacade) -> Result<bool, Error> {
    let mut registry = Registry::default();
    if !options.substitutions.is_empty() {
        registry.enable_substitutes();
    }
    let selector = Selector::parse(&options.selector, &registry).map_err(|error| {
        Error::QueryParse(QueryParseError {
            query_string: options.selector.to_string(),
            error,
        })
    })?;

    if options.mode == Mode::Render {
        if !options.quiet {
            writeln!(os.stdout(), "{}", selector.render()).map_err(Error::Output)?;
        }
        return Ok(true);
    }

    let mut query_options = QueryOptions::default().with_max_depth(options.max_depth);
    for (name, value) in options.substitution_pairs() {
        query_options = query_options.with_substitution(name, value);
    }
    let query = Query::new(&selector, &query_options).map_err(Error::Query)?;

    let roots = read_roots(options, &*os)?;
    let (found_any, results) = match options.mode {
        Mode::All | Mode::First => {
            let mut found = Vec::new();
            for root in &roots {
                if options.mode == Mode::First {
                    if let Some(first) = query.find_first(root).map_err(Error::Query)? {
                        found.push(first.clone());
                        break;
                    }
                } else {
                    found.extend(query.find_all(root).map_err(Error::Query)?.into_iter().cloned());
                }
            }
            (!found.is_empty(), found)
        }
        Mode::Reject | Mode::Filter => {
            let mut found_any = false;
            let mut trees = Vec::with_capacity(roots.len());
            for root in &roots {
                found_any |= query.find_first(root).map_err(Error::Query)?.is_some();
                let tree = if options.mode == Mode::Reject {
                    transform::reject_selected(root, &query, options.cascade)
                } else {
                    transform::filter_selected(root, &query, options.cascade)
                };
                trees.extend(tree.map_err(Error::Query)?);
            }
            (found_any, trees)
        }
        Mode::Render => (true, Vec::new()),
    };
    log::debug!("mode {} produced {} node(s)", options.mode, results.len());

    if !options.quiet {
        write_results(&results, options.output, &mut os.stdout()).map_err(Error::Output)?;
    }
    Ok(found_any)
}

fn read_roots(options: &RunOptions, os: &impl OsFacade) -> Result<Vec<Node>, Error> {
    match options.input {
        InputFormat::Markdown => {
            let contents = os.read_all(&options.file_paths)?;
            let root = read_markdown(&contents).map_err(Error::MarkdownParse)?;
            Ok(vec![root])
        }
        InputFormat::Json => os
            .read_each(&options.file_paths)?
            .into_iter()
            .map(|(input, contents)| serde_json::from_str(&contents).map_err(|err| Error::JsonParse(input, err)))
            .collect(),
    }
}

fn write_results(results: &[Node], format: OutputFormat, out: &mut impl Write) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, results)?;
            writeln!(out)
        }
        OutputFormat::Text => {
            for node in results {
                writeln!(out, "{}", transform::to_text(node))?;
            }
            Ok(())
        }
        OutputFormat::Type => {
            for node in results {
                writeln!(out, "{}", node.node_type)?;
            }
            Ok(())
        }
    }
}
