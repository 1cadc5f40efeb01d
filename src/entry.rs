//! helpers around [ldap3::SearchEntry] which is used as the entry
//! representation for task entries
//!
//! LDAP attribute names are case-insensitive but the attribute map in
//! [SearchEntry] is an ordinary [HashMap] so all lookups in this crate go
//! through [attribute_values].

use ldap3::SearchEntry;
use std::collections::{HashMap, HashSet};

/// the name of the object class attribute
pub const ATTR_OBJECT_CLASS: &str = "objectClass";

/// return the values of the attribute with the given name, comparing names
/// case-insensitively
///
/// returns an empty slice if the entry does not contain the attribute
pub fn attribute_values<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    if let Some(values) = entry.attrs.get(name) {
        return values;
    }
    entry
        .attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

/// check if an entry has a given object class, case-insensitively
pub fn has_object_class(entry: &SearchEntry, object_class: &str) -> bool {
    attribute_values(entry, ATTR_OBJECT_CLASS)
        .iter()
        .any(|oc| oc.eq_ignore_ascii_case(object_class))
}

/// escape a value for use in an RDN following RFC 4514
pub fn escape_rdn_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(c);
            }
            '#' if i == 0 => result.push_str("\\#"),
            ' ' if i == 0 || i == last => result.push_str("\\ "),
            '\0' => result.push_str("\\00"),
            c => result.push(c),
        }
    }
    result
}

/// reverse [escape_rdn_value], also accepting hex escapes like `\2C`
///
/// returns `None` if the value contains an incomplete escape sequence
pub fn unescape_rdn_value(value: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let first = chars.next()?;
        match (first.to_digit(16), chars.peek().and_then(|d| d.to_digit(16))) {
            (Some(high), Some(low)) => {
                chars.next();
                bytes.push((high * 16 + low) as u8);
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(first.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    String::from_utf8(bytes).ok()
}

/// split the first RDN off a DN, returning the attribute name and the
/// unescaped value of a single-valued RDN
pub fn leftmost_rdn(dn: &str) -> Option<(String, String)> {
    let mut escaped = false;
    let mut end = dn.len();
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' | '+' => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let (name, value) = dn[..end].split_once('=')?;
    Some((name.trim().to_string(), unescape_rdn_value(value.trim_start())?))
}

/// an insertion-ordered collection of attributes used while rendering an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryWriter {
    /// attribute names and values in the order they were added
    attributes: Vec<(String, Vec<String>)>,
}

impl EntryWriter {
    /// an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// add values for an attribute, merging with earlier values of the same
    /// attribute; empty value lists are skipped
    pub fn add_values<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self;
        }
        if let Some((_, existing)) = self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            existing.extend(values);
        } else {
            self.attributes.push((name.to_string(), values));
        }
        self
    }

    /// add a single optional value
    pub fn add_optional(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        self.add_values(name, value)
    }

    /// add an optional boolean as `true` or `false`
    pub fn add_bool(&mut self, name: &str, value: Option<bool>) -> &mut Self {
        self.add_values(name, value.map(|b| b.to_string()))
    }

    /// add an optional integer
    pub fn add_integer(&mut self, name: &str, value: Option<i64>) -> &mut Self {
        self.add_values(name, value.map(|i| i.to_string()))
    }

    /// the attributes added so far
    pub fn attributes(&self) -> &[(String, Vec<String>)] {
        &self.attributes
    }

    /// turn the collected attributes into an entry with the given DN
    pub fn into_entry(self, dn: String) -> SearchEntry {
        SearchEntry {
            dn,
            attrs: self.attributes.into_iter().collect::<HashMap<_, _>>(),
            bin_attrs: HashMap::new(),
        }
    }
}

/// convert an entry into the attribute list expected by [ldap3::Ldap::add]
///
/// the add needs to happen in one operation or we will run into problems
/// with object class requirements
pub fn add_attributes(entry: &SearchEntry) -> Vec<(String, HashSet<String>)> {
    let mut result: Vec<(String, HashSet<String>)> = entry
        .attrs
        .iter()
        .map(|(k, v)| (k.to_owned(), v.iter().cloned().collect()))
        .collect();
    result.sort_by(|(a, _), (b, _)| a.cmp(b));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn entry(attrs: &[(&str, &[&str])]) -> SearchEntry {
        SearchEntry {
            dn: "cn=test".to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn attribute_lookup_ignores_case() {
        let e = entry(&[("objectclass", &["top", "DS-Task"]), ("ds-task-id", &["a"])]);
        assert_eq!(attribute_values(&e, "objectClass"), &["top", "DS-Task"]);
        assert_eq!(attribute_values(&e, "DS-TASK-ID"), &["a"]);
        assert!(attribute_values(&e, "ds-task-state").is_empty());
        assert!(has_object_class(&e, "ds-task"));
        assert!(!has_object_class(&e, "ds-task-backup"));
    }

    #[rstest]
    #[case("simple", "simple")]
    #[case("a,b", "a\\,b")]
    #[case("#hash", "\\#hash")]
    #[case(" padded ", "\\ padded\\ ")]
    #[case("x=y+z", "x\\=y\\+z")]
    fn rdn_values_escape(#[case] raw: &str, #[case] escaped: &str) {
        assert_eq!(escape_rdn_value(raw), escaped);
        assert_eq!(unescape_rdn_value(escaped).as_deref(), Some(raw));
    }

    #[test]
    fn rdn_values_unescape_hex() {
        assert_eq!(unescape_rdn_value("a\\2Cb").as_deref(), Some("a,b"));
        assert_eq!(unescape_rdn_value("trailing\\"), None);
    }

    #[test]
    fn leftmost_rdn_respects_escapes() {
        assert_eq!(
            leftmost_rdn("ds-task-id=a\\,b,cn=Scheduled Tasks,cn=tasks"),
            Some(("ds-task-id".to_string(), "a,b".to_string()))
        );
        assert_eq!(leftmost_rdn("no-equals-sign"), None);
    }

    #[test]
    fn writer_merges_and_skips_empty() {
        let mut writer = EntryWriter::new();
        writer
            .add_values("objectClass", ["top"])
            .add_values("objectclass", ["ds-task"])
            .add_optional("ds-task-id", None)
            .add_bool("ds-task-alert-on-error", Some(true))
            .add_integer("ds-task-rebuild-max-threads", Some(4));
        assert_eq!(
            writer.attributes(),
            &[
                (
                    "objectClass".to_string(),
                    vec!["top".to_string(), "ds-task".to_string()]
                ),
                ("ds-task-alert-on-error".to_string(), vec!["true".to_string()]),
                ("ds-task-rebuild-max-threads".to_string(), vec!["4".to_string()]),
            ]
        );
        let e = writer.into_entry("cn=x".to_string());
        let add = add_attributes(&e);
        assert_eq!(add.len(), 3);
        assert_eq!(add[0].0, "ds-task-alert-on-error");
    }
}
