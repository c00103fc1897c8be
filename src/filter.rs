//! Selection of archive members.
//!
//! Exclude and extract-list patterns use `fnmatch(3)` semantics without `FNM_PATHNAME`: `*` and
//! `?` happily match `/`, `[...]` is a bracket expression (`!` or `^` negates it), and `\`
//! escapes the next character.  A leading `.` in a name is only matched by a pattern that starts
//! with a literal `.`.
//!
//! Each set of patterns is compiled into a single lazy DFA which answers "does any pattern match"
//! in one pass over the name.

use std::{collections::BTreeSet, path::Path};

use regex_automata::{hybrid::dfa, util::syntax, Anchored, Input};

use crate::{
    entry::{resolve, to_destination, EntryKind},
    error::{Error, Result},
};

/// Translates one glob into an anchored regular expression.
///
/// The regex is compiled with Unicode disabled, so every literal is written as a byte escape.
fn glob_to_regex(glob: &str) -> String {
    let bytes = glob.as_bytes();
    let mut regex = String::from("^(?s:");
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'*' => regex.push_str(".*"),
            b'?' => regex.push('.'),
            b'\\' if i + 1 < bytes.len() => {
                i += 1;
                push_literal(&mut regex, bytes[i]);
            }
            b'[' => match bracket_to_class(&bytes[i + 1..]) {
                Some((class, consumed)) => {
                    regex.push_str(&class);
                    i += consumed;
                }
                None => push_literal(&mut regex, b'['),
            },
            other => push_literal(&mut regex, other),
        }
        i += 1;
    }

    regex.push_str(")$");
    regex
}

fn push_literal(regex: &mut String, byte: u8) {
    if byte.is_ascii_alphanumeric() {
        regex.push(byte as char);
    } else {
        regex.push_str(&format!("\\x{byte:02X}"));
    }
}

/// Converts the body of a bracket expression (everything after the `[`) into a regex class.
///
/// Returns the class and the number of bytes consumed including the closing `]`, or `None` if the
/// bracket is never closed (in which case the `[` is an ordinary character).  A reversed range
/// such as `z-a` contributes nothing, so a bracket made only of those matches nothing.
fn bracket_to_class(body: &[u8]) -> Option<(String, usize)> {
    let mut members = String::new();
    let mut i = 0;

    let negated = matches!(body.first(), Some(b'!') | Some(b'^'));
    if negated {
        i += 1;
    }

    let start = i;
    loop {
        let mut byte = *body.get(i)?;
        if byte == b']' && i > start {
            break;
        }
        if byte == b'\\' {
            i += 1;
            byte = *body.get(i)?;
        }

        // a range, unless the '-' is the last thing before the closing bracket
        if body.get(i + 1) == Some(&b'-') && body.get(i + 2).is_some_and(|b| *b != b']') {
            let mut end = body[i + 2];
            i += 2;
            if end == b'\\' {
                i += 1;
                end = *body.get(i)?;
            }
            if byte <= end {
                push_class_byte(&mut members, byte);
                members.push('-');
                push_class_byte(&mut members, end);
            }
        } else {
            push_class_byte(&mut members, byte);
        }
        i += 1;
    }

    let class = match (negated, members.is_empty()) {
        (false, true) => String::from("[^\\x00-\\xFF]"),
        (true, true) => String::from("[\\x00-\\xFF]"),
        (false, false) => format!("[{members}]"),
        (true, false) => format!("[^{members}]"),
    };
    Some((class, i + 1))
}

fn push_class_byte(class: &mut String, byte: u8) {
    class.push_str(&format!("\\x{byte:02X}"));
}

fn starts_with_literal_dot(glob: &str) -> bool {
    glob.starts_with('.') || glob.starts_with("\\.")
}

#[derive(Debug)]
struct Matcher {
    dfa: dfa::DFA,
    cache: dfa::Cache,
}

impl Matcher {
    fn build(globs: &[&String]) -> Result<Option<Self>> {
        if globs.is_empty() {
            return Ok(None);
        }

        let regexps: Vec<String> = globs.iter().map(|g| glob_to_regex(g)).collect();

        let mut builder = dfa::Builder::new();
        builder.syntax(
            syntax::Config::new()
                .unicode(false)
                .utf8(false)
                .line_terminator(0),
        );
        builder.configure(
            dfa::Config::new()
                .cache_capacity(10_000_000)
                .skip_cache_capacity_check(true),
        );
        let dfa = builder.build_many(&regexps).map_err(|e| Error::Pattern {
            pattern: globs
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            message: e.to_string(),
        })?;
        let cache = dfa.create_cache();

        Ok(Some(Matcher { dfa, cache }))
    }

    // mut because it touches the cache
    fn is_match(&mut self, name: &str) -> bool {
        let input = Input::new(name.as_bytes()).anchored(Anchored::Yes);
        match self.dfa.try_search_fwd(&mut self.cache, &input) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("pattern search on {name:?} gave up: {e}");
                false
            }
        }
    }
}

/// A compiled, ordered list of globs that matches when any one of them does.
#[derive(Debug)]
pub struct PatternSet {
    globs: Vec<String>,
    // all patterns, consulted for names without a leading dot
    any: Option<Matcher>,
    // only the patterns beginning with a literal dot
    dotted: Option<Matcher>,
}

impl PatternSet {
    pub fn new(globs: &[String]) -> Result<Self> {
        let all: Vec<&String> = globs.iter().collect();
        let dotted: Vec<&String> = globs
            .iter()
            .filter(|g| starts_with_literal_dot(g))
            .collect();

        Ok(PatternSet {
            globs: globs.to_vec(),
            any: Matcher::build(&all)?,
            dotted: Matcher::build(&dotted)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    pub fn matches(&mut self, name: &str) -> bool {
        let matcher = if name.starts_with('.') {
            self.dotted.as_mut()
        } else {
            self.any.as_mut()
        };
        matcher.is_some_and(|m| m.is_match(name))
    }
}

/// Selection state for one operation: the compiled patterns plus the set of wanted names the
/// listing pass computed.
#[derive(Debug)]
pub struct Filters {
    exclude: PatternSet,
    extract_list: PatternSet,
    filtered: BTreeSet<String>,
}

impl Filters {
    pub fn new(exclude: &[String], extract_list: &[String]) -> Result<Self> {
        Ok(Filters {
            exclude: PatternSet::new(exclude)?,
            extract_list: PatternSet::new(extract_list)?,
            filtered: BTreeSet::new(),
        })
    }

    /// True if any exclude pattern matches `name`.
    pub fn excluded(&mut self, name: &str) -> bool {
        self.exclude.matches(name)
    }

    /// True if the extract-list is non-empty and one of its patterns matches `name`.
    ///
    /// An empty extract-list means "everything"; that is decided by [`Filters::selected`], not
    /// here.
    pub fn on_list(&mut self, name: &str) -> bool {
        !self.extract_list.is_empty() && self.extract_list.matches(name)
    }

    /// On the extract-list (or there is no list) and not excluded.
    pub fn selected(&mut self, name: &str) -> bool {
        (self.extract_list.is_empty() || self.on_list(name)) && !self.excluded(name)
    }

    pub(crate) fn set_filtered(&mut self, filtered: BTreeSet<String>) {
        self.filtered = filtered;
    }

    /// Decides whether the extraction pass should act on a record at all.
    ///
    /// Nothing is wanted if its destination already exists and `overwrite` is off.  Links are
    /// always (re)written, and header records are always admitted since they only carry state to
    /// the next record.  Everything else must have been selected by the listing pass.
    pub fn wanted(
        &self,
        name: &str,
        kind: EntryKind,
        overwrite: bool,
        destination: &Path,
        strip_components: usize,
    ) -> bool {
        let relative = resolve(name, strip_components);
        if !overwrite
            && !relative.as_os_str().is_empty()
            && to_destination(&relative, destination)
                .symlink_metadata()
                .is_ok()
        {
            false
        } else if matches!(kind, EntryKind::Link(..)) || kind.is_header() {
            true
        } else {
            self.filtered.contains(name)
        }
    }
}
