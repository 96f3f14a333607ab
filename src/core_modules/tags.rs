// THEORY:
// Artists annotate layers and items with lightweight text tags instead of
// filling dialogs: `[G7]` or a bare `G7` assigns a group, `LOCK`/`[L]` and
// `UNLOCK`/`[U]` force the lock flag. This module turns those conventions
// into resolved metadata. Matching is case-insensitive, bracket tags beat
// inline tags, a lock tag beats an unlock tag, and anything untagged falls
// back to caller-supplied defaults. When both a name and a note are
// available, a note carrying a group tag takes over completely; a note
// without one is ignored. The resolved record keeps its provenance so hosts
// can show users where a value came from.

use crate::core_modules::channel_codec::channel_codec::GroupId;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

static GROUP_BRACKET_PATTERN: OnceLock<Regex> = OnceLock::new();
static GROUP_INLINE_PATTERN: OnceLock<Regex> = OnceLock::new();
static LOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static UNLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn group_bracket_pattern() -> &'static Regex {
    GROUP_BRACKET_PATTERN
        .get_or_init(|| Regex::new(r"(?i)\[G(1[0-5]|[0-9])\]").expect("valid regex"))
}

fn group_inline_pattern() -> &'static Regex {
    GROUP_INLINE_PATTERN
        .get_or_init(|| Regex::new(r"(?i)\bG(1[0-5]|[0-9])\b").expect("valid regex"))
}

fn lock_pattern() -> &'static Regex {
    LOCK_PATTERN.get_or_init(|| Regex::new(r"(?i)\bLOCK\b|\[L\]").expect("valid regex"))
}

fn unlock_pattern() -> &'static Regex {
    UNLOCK_PATTERN.get_or_init(|| Regex::new(r"(?i)\bUNLOCK\b|\[U\]").expect("valid regex"))
}

/// Where a resolved metadata value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// No group tag anywhere; defaults were used.
    Default,
    /// Group tag found in the name.
    Name,
    /// Group tag found in the note, overriding the name.
    Note,
}

/// Group and lock metadata resolved from tag text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    pub group_id: GroupId,
    pub locked: bool,
    pub source: TagSource,
}

/// Parses one piece of tag text (a layer or item name).
///
/// The group comes from a bracket tag first, an inline tag second, the
/// fallback last. The lock flag honors a lock tag over an unlock tag over
/// the fallback. Source is `Name` exactly when a group tag matched; lock
/// tags alone never change attribution.
pub fn parse_tags(text: &str, fallback_group: GroupId, fallback_lock: bool) -> TagMetadata {
    let tagged_group = group_bracket_pattern()
        .captures(text)
        .or_else(|| group_inline_pattern().captures(text))
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse::<GroupId>().ok());

    let locked = if lock_pattern().is_match(text) {
        true
    } else if unlock_pattern().is_match(text) {
        false
    } else {
        fallback_lock
    };

    TagMetadata {
        group_id: tagged_group.unwrap_or(fallback_group),
        locked,
        source: if tagged_group.is_some() {
            TagSource::Name
        } else {
            TagSource::Default
        },
    }
}

/// Resolves metadata from a name and an accompanying note.
///
/// A note carrying a group tag wins outright; its lock resolution is taken
/// too, even when the name also carries lock tags. A note without a group
/// tag contributes nothing.
pub fn resolve_tags(
    name: &str,
    note: &str,
    fallback_group: GroupId,
    fallback_lock: bool,
) -> TagMetadata {
    let note_metadata = parse_tags(note, fallback_group, fallback_lock);
    if note_metadata.source == TagSource::Name {
        return TagMetadata {
            source: TagSource::Note,
            ..note_metadata
        };
    }
    parse_tags(name, fallback_group, fallback_lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_tag_with_lock() {
        let metadata = parse_tags("[G7] LOCK", 0, false);
        assert_eq!(metadata.group_id, 7);
        assert!(metadata.locked);
        assert_eq!(metadata.source, TagSource::Name);
    }

    #[test]
    fn inline_tag_on_word_boundary() {
        let metadata = parse_tags("sprite G12", 0, false);
        assert_eq!(metadata.group_id, 12);
        assert_eq!(metadata.source, TagSource::Name);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(parse_tags("[g3]", 0, false).group_id, 3);
        assert!(parse_tags("background lock", 0, false).locked);
        assert!(!parse_tags("Unlock this one", 0, true).locked);
    }

    #[test]
    fn bracket_beats_inline() {
        let metadata = parse_tags("g2 overlay [G9]", 0, false);
        assert_eq!(metadata.group_id, 9);
    }

    #[test]
    fn lock_beats_unlock() {
        assert!(parse_tags("UNLOCK LOCK", 0, false).locked);
    }

    #[test]
    fn out_of_range_group_does_not_match() {
        let metadata = parse_tags("G16", 5, false);
        assert_eq!(metadata.group_id, 5);
        assert_eq!(metadata.source, TagSource::Default);
    }

    #[test]
    fn embedded_words_do_not_trigger_lock_tags() {
        assert!(!parse_tags("BLOCKED", 0, false).locked);
        assert!(parse_tags("UNLOCKED", 0, true).locked);
    }

    #[test]
    fn untagged_text_uses_fallbacks() {
        let metadata = parse_tags("background", 4, true);
        assert_eq!(metadata.group_id, 4);
        assert!(metadata.locked);
        assert_eq!(metadata.source, TagSource::Default);
    }

    #[test]
    fn unlock_alone_clears_fallback_lock() {
        let metadata = parse_tags("[U] scratch", 0, true);
        assert!(!metadata.locked);
    }

    #[test]
    fn tagged_note_overrides_name_entirely() {
        // The note carries a group tag, so its whole resolution wins and the
        // name's LOCK is ignored.
        let metadata = resolve_tags("[G9] LOCK", "[G4]", 0, false);
        assert_eq!(metadata.group_id, 4);
        assert!(!metadata.locked);
        assert_eq!(metadata.source, TagSource::Note);
    }

    #[test]
    fn untagged_note_contributes_nothing() {
        let metadata = resolve_tags("art G5", "LOCK", 0, false);
        assert_eq!(metadata.group_id, 5);
        assert!(!metadata.locked);
        assert_eq!(metadata.source, TagSource::Name);
    }

    #[test]
    fn empty_sources_resolve_to_defaults() {
        let metadata = resolve_tags("", "", 2, false);
        assert_eq!(metadata.group_id, 2);
        assert!(!metadata.locked);
        assert_eq!(metadata.source, TagSource::Default);
    }
}
