//! `+cue-gen` comment tags
//!
//! A message opts into CRD generation with tags in its leading comment:
//!
//! ```text
//! // <!-- crd generation tags
//! // +cue-gen:Foo:groupName:foo.istio.io
//! // +cue-gen:Foo:versions:v1,v1alpha1
//! // +cue-gen:Foo:printerColumn:name=Age,type=date,JSONPath=.metadata.creationTimestamp,
//! // description="CreationTimestamp is a timestamp"
//! // -->
//! ```
//!
//! Lines that do not start a tag continue the previous tag line. Repeated
//! keys accumulate, joined by `;;`.

use std::collections::BTreeMap;

use crate::error::{GenError, Result};

pub const CUE_GEN_TAG: &str = "+cue-gen";

/// Separator between the values of a repeated tag key
pub const REPEATED_SEPARATOR: &str = ";;";

/// Join continuation lines onto the tag line they belong to.
///
/// The output may contain empty entries where a tag line was flushed without
/// a predecessor; callers skip them.
pub fn clean_comments<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    let mut previous = String::new();

    for line in lines {
        let line = line.trim_matches(' ');

        if line == "-->" {
            out.push(std::mem::take(&mut previous));
            continue;
        }

        if !line.starts_with(CUE_GEN_TAG) {
            if !previous.is_empty() && !line.is_empty() {
                previous.push(' ');
                previous.push_str(line);
            }
            continue;
        }

        out.push(std::mem::replace(&mut previous, line.to_string()));
    }

    if !previous.is_empty() {
        out.push(previous);
    }
    out
}

/// Parse every `+cue-gen:<Kind>:<key>[:<value>]` tag of a comment into a
/// key to value map. Returns an empty map when the comment has no tags.
pub fn parse_gen_tags(comment: &str) -> Result<BTreeMap<String, String>> {
    let mut tags: BTreeMap<String, String> = BTreeMap::new();

    for line in clean_comments(comment.split('\n')) {
        let Some((_, contents)) = line.split_once(CUE_GEN_TAG) else {
            continue;
        };
        let contents = contents.strip_prefix(':').unwrap_or(contents);
        let parts: Vec<&str> = contents.splitn(3, ':').collect();
        if parts.len() < 2 {
            return Err(GenError::InvalidTag(line));
        }
        let key = parts[1];
        let value = parts.get(2).copied().unwrap_or_default();

        tags.entry(key.to_string())
            .and_modify(|existing| {
                existing.push_str(REPEATED_SEPARATOR);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    Ok(tags)
}

/// Split `a=b,c=d` into `{a: b, c: d}`.
///
/// A value runs up to the last comma before the next `=`, so `a=b,c,d,e=f`
/// yields `{a: "b,c,d", e: f}`. Surrounding quotes and backticks are trimmed
/// from values. A string without `=` is a single key with an empty value.
pub fn extract_key_value(input: &str) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if input.is_empty() {
        return Ok(out);
    }

    let fail = |reason: &str| GenError::InvalidKeyValue {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let splits: Vec<&str> = input.split('=').collect();
    if splits.len() == 1 {
        out.insert(splits[0].to_string(), String::new());
    }
    if splits[0].contains(',') {
        return Err(fail("key contains a separator"));
    }

    let mut next_key = splits[0];
    let last = splits.len() - 1;
    for (i, split) in splits.iter().enumerate().skip(1) {
        if split.is_empty() || *split == "," {
            return Err(fail("invalid value"));
        }
        if i == last {
            out.insert(next_key.to_string(), trim_quotes(split).to_string());
            continue;
        }
        let Some(comma) = split.rfind(',') else {
            return Err(fail("missing separator"));
        };
        out.insert(next_key.to_string(), trim_quotes(&split[..comma]).to_string());
        next_key = &split[comma + 1..];
        if next_key.is_empty() {
            return Err(fail("missing key"));
        }
    }

    Ok(out)
}

fn trim_quotes(value: &str) -> &str {
    value.trim_matches(|c| matches!(c, '"' | '\'' | '`'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    // =========================================================================
    // extract_key_value
    // =========================================================================

    #[test]
    fn test_extract_simple_pairs() {
        assert_eq!(extract_key_value("a=b,c=d").unwrap(), map(&[("a", "b"), ("c", "d")]));
    }

    #[test]
    fn test_extract_value_with_commas() {
        assert_eq!(extract_key_value("a=b,c,d,e=f").unwrap(), map(&[("a", "b,c,d"), ("e", "f")]));
    }

    #[test]
    fn test_extract_trims_quotes() {
        let kv = extract_key_value("name=Hosts,description=\"The hosts\",JSONPath=`.spec.hosts`").unwrap();
        assert_eq!(kv["description"], "The hosts");
        assert_eq!(kv["JSONPath"], ".spec.hosts");
    }

    #[test]
    fn test_extract_lone_key_and_empty() {
        assert_eq!(extract_key_value("status").unwrap(), map(&[("status", "")]));
        assert!(extract_key_value("").unwrap().is_empty());
    }

    #[test]
    fn test_extract_errors() {
        assert!(extract_key_value("a,b=c").is_err());
        assert!(extract_key_value("a==b").is_err());
        assert!(extract_key_value("a=b=c").is_err());
        assert!(extract_key_value("a=b,=c").is_err());
    }

    // =========================================================================
    // parse_gen_tags
    // =========================================================================

    #[test]
    fn test_parse_tags_with_continuation() {
        let comment = "\
 Foo is a thing.
 <!-- crd generation tags
 +cue-gen:Foo:groupName:foo.istio.io
 +cue-gen:Foo:printerColumn:name=Age,type=date,JSONPath=.metadata.creationTimestamp,
 description=\"Age of the resource\"
 +cue-gen:Foo:printerColumn:name=Hosts,type=string,JSONPath=.spec.hosts
 +cue-gen:Foo:spec:required
 -->
 Trailing prose.";

        let tags = parse_gen_tags(comment).unwrap();
        assert_eq!(tags["groupName"], "foo.istio.io");
        assert_eq!(tags["spec"], "required");
        assert_eq!(
            tags["printerColumn"],
            "name=Age,type=date,JSONPath=.metadata.creationTimestamp, description=\"Age of the resource\";;\
             name=Hosts,type=string,JSONPath=.spec.hosts"
        );
    }

    #[test]
    fn test_value_keeps_colons() {
        let tags = parse_gen_tags("+cue-gen:Foo:annotations:helm.sh/resource-policy=keep,url=http://x").unwrap();
        assert_eq!(tags["annotations"], "helm.sh/resource-policy=keep,url=http://x");
    }

    #[test]
    fn test_key_without_value() {
        let tags = parse_gen_tags("+cue-gen:Foo:storageVersion").unwrap();
        assert_eq!(tags["storageVersion"], "");
    }

    #[test]
    fn test_no_tags() {
        assert!(parse_gen_tags(" Just a comment.\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_tag() {
        let err = parse_gen_tags("+cue-gen:FooOnly").unwrap_err();
        assert!(matches!(err, GenError::InvalidTag(_)));
    }

    #[test]
    fn test_clean_comments_flushes_on_terminator() {
        let lines = clean_comments(["+cue-gen:A:x:1", "more", "-->", "ignored", "+cue-gen:A:y:2"]);
        assert_eq!(lines, vec!["", "+cue-gen:A:x:1 more", "", "+cue-gen:A:y:2"]);
    }
}
