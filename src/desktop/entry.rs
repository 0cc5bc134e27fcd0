// src/desktop/entry.rs

//! Round-tripping key-file model for launcher documents
//!
//! A document is an ordered list of groups (`[Desktop Entry]`,
//! `[Desktop Action Remove]`, ...), each holding comment lines and
//! `key[locale]=value` entries in file order. Lines that are never modified
//! are written back exactly as they were read, so unrelated sections and
//! comments survive a load/save cycle untouched.

use crate::error::{Error, Result};
use crate::filesystem;
use std::fmt;
use std::path::Path;

/// Main group of every launcher document
pub const DESKTOP_ENTRY_GROUP: &str = "Desktop Entry";

/// Prefix of action group names (`Desktop Action <id>`)
pub const ACTION_GROUP_PREFIX: &str = "Desktop Action ";

/// Name of the group describing action `id`
pub fn action_group(id: &str) -> String {
    format!("{}{}", ACTION_GROUP_PREFIX, id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyEntry {
    key: String,
    locale: Option<String>,
    /// Value in escaped on-disk form
    value: String,
    /// Original line, kept until the entry is modified
    raw: Option<String>,
}

impl KeyEntry {
    fn render(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        match &self.locale {
            Some(locale) => format!("{}[{}]={}", self.key, locale, self.value),
            None => format!("{}={}", self.key, self.value),
        }
    }

    fn is(&self, key: &str, locale: Option<&str>) -> bool {
        self.key == key && self.locale.as_deref() == locale
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Comment or blank line, verbatim
    Comment(String),
    Entry(KeyEntry),
}

impl Line {
    fn is_blank(&self) -> bool {
        matches!(self, Line::Comment(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    name: String,
    header: Option<String>,
    lines: Vec<Line>,
}

impl Group {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            header: None,
            lines: Vec::new(),
        }
    }

    fn entry(&self, key: &str, locale: Option<&str>) -> Option<&KeyEntry> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry(entry) if entry.is(key, locale) => Some(entry),
            _ => None,
        })
    }

    fn entry_mut(&mut self, key: &str, locale: Option<&str>) -> Option<&mut KeyEntry> {
        self.lines.iter_mut().find_map(|line| match line {
            Line::Entry(entry) if entry.is(key, locale) => Some(entry),
            _ => None,
        })
    }

    /// Index just past the last non-blank line
    fn content_end(&self) -> usize {
        self.lines
            .iter()
            .rposition(|line| !line.is_blank())
            .map(|pos| pos + 1)
            .unwrap_or(0)
    }

    /// Index just past the last entry for `key` in any locale
    fn key_end(&self, key: &str) -> Option<usize> {
        self.lines
            .iter()
            .rposition(|line| matches!(line, Line::Entry(entry) if entry.key == key))
            .map(|pos| pos + 1)
    }

    fn insert(&mut self, at: usize, key: &str, locale: Option<&str>, value: String) {
        self.lines.insert(
            at,
            Line::Entry(KeyEntry {
                key: key.to_string(),
                locale: locale.map(|l| l.to_string()),
                value,
                raw: None,
            }),
        );
    }
}

/// Parsed launcher document (freedesktop key file)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    /// Comment lines before the first group
    preamble: Vec<String>,
    groups: Vec<Group>,
}

impl DesktopEntry {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from text
    pub fn parse(content: &str) -> Result<Self> {
        let mut doc = Self::new();

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                match doc.groups.last_mut() {
                    Some(group) => group.lines.push(Line::Comment(line.to_string())),
                    None => doc.preamble.push(line.to_string()),
                }
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .filter(|name| !name.is_empty() && !name.contains(['[', ']']))
                    .ok_or_else(|| {
                        Error::FormatError(format!("Line {}: invalid group header: {}", line_no, line))
                    })?;

                doc.groups.push(Group {
                    name: name.to_string(),
                    header: Some(line.to_string()),
                    lines: Vec::new(),
                });
                continue;
            }

            let Some((key_part, value)) = line.split_once('=') else {
                return Err(Error::FormatError(format!(
                    "Line {}: expected key=value, group header or comment: {}",
                    line_no, line
                )));
            };

            let (key, locale) = parse_key(key_part.trim()).ok_or_else(|| {
                Error::FormatError(format!("Line {}: invalid key: {}", line_no, key_part.trim()))
            })?;

            let Some(group) = doc.groups.last_mut() else {
                return Err(Error::FormatError(format!(
                    "Line {}: key '{}' outside of any group",
                    line_no, key
                )));
            };

            group.lines.push(Line::Entry(KeyEntry {
                key,
                locale,
                value: value.trim_start().to_string(),
                raw: Some(line.to_string()),
            }));
        }

        Ok(doc)
    }

    /// Load and parse a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content).map_err(|e| match e {
            Error::FormatError(msg) => Error::FormatError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Write the document to disk atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        filesystem::atomic_write(path, self.to_string().as_bytes())
    }

    /// Names of all groups in file order
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.group(group).is_some()
    }

    fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// First group called `name`, appended to the document if missing
    fn group_mut_or_insert(&mut self, name: &str) -> &mut Group {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                // keep a blank line between groups
                if let Some(last) = self.groups.last_mut() {
                    if !last.lines.last().is_some_and(Line::is_blank) {
                        last.lines.push(Line::Comment(String::new()));
                    }
                }
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Unlocalized string value of `key`
    pub fn get(&self, group: &str, key: &str) -> Option<String> {
        self.group(group)?
            .entry(key, None)
            .map(|entry| unescape(&entry.value))
    }

    /// Value of `key[locale]`, exact locale match only
    pub fn get_locale(&self, group: &str, key: &str, locale: &str) -> Option<String> {
        self.group(group)?
            .entry(key, Some(locale))
            .map(|entry| unescape(&entry.value))
    }

    /// Locales for which `key` has a localized value
    pub fn locales_of(&self, group: &str, key: &str) -> Vec<String> {
        let Some(group) = self.group(group) else {
            return Vec::new();
        };
        group
            .lines
            .iter()
            .filter_map(|line| match line {
                Line::Entry(entry) if entry.key == key => entry.locale.clone(),
                _ => None,
            })
            .collect()
    }

    /// Set the unlocalized value of `key`, creating group and key as needed
    pub fn set(&mut self, group: &str, key: &str, value: &str) {
        self.set_escaped(group, key, None, escape(value));
    }

    /// Set the value of `key[locale]`
    pub fn set_locale(&mut self, group: &str, key: &str, locale: &str, value: &str) {
        self.set_escaped(group, key, Some(locale), escape(value));
    }

    fn set_escaped(&mut self, group: &str, key: &str, locale: Option<&str>, value: String) {
        let group = self.group_mut_or_insert(group);

        if let Some(entry) = group.entry_mut(key, locale) {
            entry.value = value;
            entry.raw = None;
            return;
        }

        // localized variants go right after their key
        let at = match locale {
            Some(_) => group.key_end(key).unwrap_or_else(|| group.content_end()),
            None => group.content_end(),
        };
        group.insert(at, key, locale, value);
    }

    /// `;`-separated list value of `key`
    pub fn get_list(&self, group: &str, key: &str) -> Option<Vec<String>> {
        let entry = self.group(group)?.entry(key, None)?;
        Some(split_list(&entry.value))
    }

    /// Store `items` as a `;`-separated list with trailing separator
    pub fn set_list<S: AsRef<str>>(&mut self, group: &str, key: &str, items: &[S]) {
        let mut value = String::new();
        for item in items {
            value.push_str(&escape(item.as_ref()).replace(';', "\\;"));
            value.push(';');
        }
        self.set_escaped(group, key, None, value);
    }

    /// Remove `key` and all of its localized variants from `group`
    pub fn remove_key(&mut self, group: &str, key: &str) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.name == group) else {
            return false;
        };
        let before = group.lines.len();
        group
            .lines
            .retain(|line| !matches!(line, Line::Entry(entry) if entry.key == key));
        group.lines.len() != before
    }

    /// Remove every group called `name`
    pub fn remove_group(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.name != name);
        self.groups.len() != before
    }
}

impl fmt::Display for DesktopEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.preamble {
            writeln!(f, "{}", line)?;
        }

        for group in &self.groups {
            match &group.header {
                Some(header) => writeln!(f, "{}", header)?,
                None => writeln!(f, "[{}]", group.name)?,
            }
            for line in &group.lines {
                match line {
                    Line::Comment(text) => writeln!(f, "{}", text)?,
                    Line::Entry(entry) => writeln!(f, "{}", entry.render())?,
                }
            }
        }

        Ok(())
    }
}

/// Split `Name[de_DE]` into key and locale
fn parse_key(key_part: &str) -> Option<(String, Option<String>)> {
    let (key, locale) = match key_part.strip_suffix(']') {
        Some(rest) => {
            let (key, locale) = rest.split_once('[')?;
            if locale.is_empty() || locale.contains(['[', ']']) {
                return None;
            }
            (key, Some(locale.to_string()))
        }
        None => (key_part, None),
    };

    if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '[' || c == ']') {
        return None;
    }

    Some((key.to_string(), locale))
}

/// Escape a string value for storage
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' if i == 0 => out.push_str("\\s"),
            c => out.push(c),
        }
    }
    out
}

/// Undo `escape`; unknown escape sequences are kept literally
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split an escaped list value on unescaped `;`
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => current.push(';'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ';' => items.push(unescape(&std::mem::take(&mut current))),
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        items.push(unescape(&current));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# generated by appimaged\n\
[Desktop Entry]\n\
Type=Application\n\
Name=Foo Editor\n\
Name[de]=Foo Bearbeiter\n\
Exec=\"/home/u/Applications/Foo.AppImage\" %U\n\
# keep this comment\n\
Icon=appimagekit_foo\n\
\n\
[Desktop Action NewWindow]\n\
Name=New Window\n\
Exec=foo --new-window\n\
\n\
[X-Vendor Extras]\n\
Weird-Key = kept as is\n";

    #[test]
    fn test_roundtrip_untouched_document() {
        let doc = DesktopEntry::parse(SAMPLE).unwrap();
        assert_eq!(doc.to_string(), SAMPLE);
    }

    #[test]
    fn test_get_values() {
        let doc = DesktopEntry::parse(SAMPLE).unwrap();
        assert_eq!(doc.get(DESKTOP_ENTRY_GROUP, "Name").unwrap(), "Foo Editor");
        assert_eq!(
            doc.get_locale(DESKTOP_ENTRY_GROUP, "Name", "de").unwrap(),
            "Foo Bearbeiter"
        );
        assert!(doc.get_locale(DESKTOP_ENTRY_GROUP, "Name", "fr").is_none());
        assert_eq!(doc.get("X-Vendor Extras", "Weird-Key").unwrap(), "kept as is");
        assert!(doc.get(DESKTOP_ENTRY_GROUP, "Missing").is_none());
        assert_eq!(
            doc.group_names(),
            vec!["Desktop Entry", "Desktop Action NewWindow", "X-Vendor Extras"]
        );
    }

    #[test]
    fn test_set_preserves_unrelated_lines() {
        let mut doc = DesktopEntry::parse(SAMPLE).unwrap();
        doc.set(DESKTOP_ENTRY_GROUP, "Name", "Foo Editor (2)");

        let out = doc.to_string();
        assert!(out.contains("Name=Foo Editor (2)\n"));
        assert!(out.contains("# keep this comment\n"));
        assert!(out.contains("Weird-Key = kept as is\n"));
        assert!(out.starts_with("# generated by appimaged\n"));
    }

    #[test]
    fn test_new_key_goes_after_last_entry() {
        let mut doc = DesktopEntry::parse(SAMPLE).unwrap();
        doc.set(DESKTOP_ENTRY_GROUP, "TryExec", "/x");

        let out = doc.to_string();
        assert!(out.contains("Icon=appimagekit_foo\nTryExec=/x\n\n[Desktop Action NewWindow]"));
    }

    #[test]
    fn test_new_group_is_separated() {
        let mut doc = DesktopEntry::parse("[Desktop Entry]\nName=A\n").unwrap();
        doc.set(&action_group("Remove"), "Name", "Remove");
        assert_eq!(
            doc.to_string(),
            "[Desktop Entry]\nName=A\n\n[Desktop Action Remove]\nName=Remove\n"
        );
    }

    #[test]
    fn test_set_locale_follows_key() {
        let mut doc = DesktopEntry::parse("[G]\nName=A\nExec=b\n").unwrap();
        doc.set_locale("G", "Name", "fr", "Ah");
        assert_eq!(doc.to_string(), "[G]\nName=A\nName[fr]=Ah\nExec=b\n");
        assert_eq!(doc.locales_of("G", "Name"), vec!["fr".to_string()]);
    }

    #[test]
    fn test_list_values() {
        let mut doc = DesktopEntry::parse("[Desktop Entry]\nActions=Remove;Update;\n").unwrap();
        assert_eq!(
            doc.get_list(DESKTOP_ENTRY_GROUP, "Actions").unwrap(),
            vec!["Remove".to_string(), "Update".to_string()]
        );

        doc.set_list(DESKTOP_ENTRY_GROUP, "Actions", &["Remove", "a;b"]);
        assert!(doc.to_string().contains("Actions=Remove;a\\;b;\n"));
        assert_eq!(
            doc.get_list(DESKTOP_ENTRY_GROUP, "Actions").unwrap(),
            vec!["Remove".to_string(), "a;b".to_string()]
        );
    }

    #[test]
    fn test_escaping_roundtrip() {
        let mut doc = DesktopEntry::new();
        doc.set("G", "Comment", " leading\ttab\nnewline \\ slash");
        assert!(doc.to_string().contains("Comment=\\sleading\\ttab\\nnewline \\\\ slash\n"));
        assert_eq!(
            doc.get("G", "Comment").unwrap(),
            " leading\ttab\nnewline \\ slash"
        );
    }

    #[test]
    fn test_remove_key_and_group() {
        let mut doc = DesktopEntry::parse(SAMPLE).unwrap();
        assert!(doc.remove_key(DESKTOP_ENTRY_GROUP, "Name"));
        assert!(doc.get(DESKTOP_ENTRY_GROUP, "Name").is_none());
        assert!(doc.get_locale(DESKTOP_ENTRY_GROUP, "Name", "de").is_none());

        assert!(doc.remove_group("Desktop Action NewWindow"));
        assert!(!doc.has_group("Desktop Action NewWindow"));
        assert!(!doc.remove_group("Desktop Action NewWindow"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DesktopEntry::parse("Name=orphan\n"),
            Err(Error::FormatError(_))
        ));
        assert!(matches!(
            DesktopEntry::parse("[Desktop Entry]\njust some text\n"),
            Err(Error::FormatError(_))
        ));
        assert!(matches!(
            DesktopEntry::parse("[Desktop Entry\nName=x\n"),
            Err(Error::FormatError(_))
        ));
        assert!(matches!(
            DesktopEntry::parse("[Desktop Entry]\n=value\n"),
            Err(Error::FormatError(_))
        ));
    }

    #[test]
    fn test_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.desktop");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut doc = DesktopEntry::load(&path).unwrap();
        doc.set(DESKTOP_ENTRY_GROUP, "X-Test", "1");
        doc.save(&path).unwrap();

        let reloaded = DesktopEntry::load(&path).unwrap();
        assert_eq!(reloaded.get(DESKTOP_ENTRY_GROUP, "X-Test").unwrap(), "1");
        assert_eq!(reloaded.get("X-Vendor Extras", "Weird-Key").unwrap(), "kept as is");
    }

    #[test]
    fn test_load_missing_file() {
        let result = DesktopEntry::load(Path::new("/nonexistent/foo.desktop"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
