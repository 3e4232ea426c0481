//! XMP packet scanner.
//!
//! XMP is an RDF/XML document that editors (Lightroom, darktable, digiKam)
//! embed verbatim in the file: JPEG APP1, TIFF tag 700, PNG `iTXt`, WebP `XMP `
//! chunk. Since the packet is stored uncompressed in all of these, the bytes
//! are searched directly for `<x:xmpmeta … </x:xmpmeta>` instead of walking
//! each container format.
//!
//! Only three Dublin Core properties are read:
//!
//! ```xml
//! <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Mola mola</rdf:li></rdf:Alt></dc:title>
//! <dc:description><rdf:Alt><rdf:li xml:lang="x-default">…</rdf:li></rdf:Alt></dc:description>
//! <dc:subject><rdf:Bag><rdf:li>bali</rdf:li><rdf:li>nusa penida</rdf:li></rdf:Bag></dc:subject>
//! ```
//!
//! Simple values written as attributes of `rdf:Description`
//! (`dc:title="Mola mola"`) are accepted too.

use super::{EmbeddedMetadata, ExtractError};

const PACKET_OPENERS: [&[u8]; 2] = [b"<x:xmpmeta", b"<x:xapmeta"];
const PACKET_CLOSERS: [&[u8]; 2] = [b"</x:xmpmeta>", b"</x:xapmeta>"];

const DEFAULT_LANGUAGE: &str = "x-default";

/// Find the XMP packet in raw file bytes.
///
/// `Ok(None)` when the file has no packet; an opened but unterminated packet,
/// or one that is not UTF-8, is an error.
pub fn find_packet(data: &[u8]) -> Result<Option<&str>, ExtractError> {
    for (opener, closer) in PACKET_OPENERS.iter().zip(PACKET_CLOSERS) {
        let Some(start) = find_bytes(data, opener) else {
            continue;
        };
        let end = find_bytes(&data[start..], closer)
            .map(|rel| start + rel + closer.len())
            .ok_or(ExtractError::MalformedXmp("unterminated packet"))?;
        let packet = std::str::from_utf8(&data[start..end])
            .map_err(|_| ExtractError::MalformedXmp("packet is not UTF-8"))?;
        return Ok(Some(packet));
    }
    Ok(None)
}

/// Read title, description and subject from a packet.
pub fn parse(packet: &str) -> EmbeddedMetadata {
    EmbeddedMetadata {
        title: language_alternative(packet, "dc:title"),
        description: language_alternative(packet, "dc:description"),
        subject: list(packet, "dc:subject"),
    }
}

/// A `rdf:Alt` property: the `x-default` entry, else the first one.
fn language_alternative(packet: &str, property: &str) -> Option<String> {
    match element_content(packet, property) {
        Some(content) => {
            let items = list_items(content);
            items
                .iter()
                .find(|item| item.lang.as_deref() == Some(DEFAULT_LANGUAGE))
                .or_else(|| items.first())
                .map(|item| item.value.clone())
        }
        None => attribute_value(packet, property),
    }
}

/// A `rdf:Bag` or `rdf:Seq` property, in document order.
fn list(packet: &str, property: &str) -> Option<Vec<String>> {
    match element_content(packet, property) {
        Some(content) => Some(
            list_items(content)
                .into_iter()
                .map(|item| item.value)
                .collect(),
        ),
        None => attribute_value(packet, property).map(|value| vec![value]),
    }
}

#[derive(Debug)]
struct ListItem {
    lang: Option<String>,
    value: String,
}

/// Every `<rdf:li>` in an element body.
fn list_items(content: &str) -> Vec<ListItem> {
    let mut items = Vec::new();
    let mut rest = content;

    while let Some(open) = find_tag(rest, "rdf:li") {
        let after_name = &rest[open + "<rdf:li".len()..];
        let Some(tag_end) = after_name.find('>') else {
            break;
        };
        let attributes = &after_name[..tag_end];
        let lang = attribute_value(attributes, "xml:lang");
        let body = &after_name[tag_end + 1..];

        if attributes.ends_with('/') {
            items.push(ListItem {
                lang,
                value: String::new(),
            });
            rest = body;
            continue;
        }

        let Some(close) = body.find("</rdf:li>") else {
            break;
        };
        items.push(ListItem {
            lang,
            value: decode_entities(body[..close].trim()),
        });
        rest = &body[close + "</rdf:li>".len()..];
    }
    items
}

/// Body of `<name …>body</name>`. A self-closing element has an empty body.
fn element_content<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let open = find_tag(xml, name)?;
    let after_name = &xml[open + 1 + name.len()..];
    let tag_end = after_name.find('>')?;
    if after_name[..tag_end].ends_with('/') {
        return Some("");
    }
    let body = &after_name[tag_end + 1..];
    let close = body.find(&format!("</{name}>"))?;
    Some(&body[..close])
}

/// Position of `<name` followed by whitespace, `>` or `/`.
fn find_tag(xml: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut from = 0;
    while let Some(rel) = xml[from..].find(&needle) {
        let at = from + rel;
        let next = xml[at + needle.len()..].chars().next();
        if matches!(next, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

/// Value of `name="…"` (or single-quoted) anywhere in `xml`.
fn attribute_value(xml: &str, name: &str) -> Option<String> {
    let mut from = 0;
    while let Some(rel) = xml[from..].find(name) {
        let at = from + rel;
        from = at + name.len();

        // Must be a whole attribute name, not the tail of a longer one
        let preceded_ok = xml[..at]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let rest = xml[from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        if !preceded_ok {
            continue;
        }
        let rest = rest.trim_start();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value = &rest[1..];
        let end = value.find(quote)?;
        return Some(decode_entities(&value[..end]));
    }
    None
}

/// Decode the predefined XML entities and numeric character references.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').and_then(|semi| {
            let entity = &candidate[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::xmp_packet;

    #[test]
    fn finds_packet_inside_other_bytes() {
        let packet = xmp_packet(Some("Mola mola"), None, None);
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10];
        data.extend_from_slice(packet.as_bytes());
        data.extend_from_slice(&[0xFF, 0xD9]);

        assert_eq!(find_packet(&data).unwrap(), Some(packet.as_str()));
    }

    #[test]
    fn no_packet() {
        assert_eq!(find_packet(b"\xFF\xD8\xFF\xD9").unwrap(), None);
    }

    #[test]
    fn unterminated_packet_is_error() {
        let result = find_packet(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF>");
        assert!(matches!(result, Err(ExtractError::MalformedXmp(_))));
    }

    #[test]
    fn parses_all_fields() {
        let packet = xmp_packet(
            Some("Mola mola"),
            Some("Poisson lune (Mola mola), Nusa Penida"),
            Some(&["bali", "nusa penida"][..]),
        );
        let meta = parse(&packet);
        assert_eq!(meta.title.as_deref(), Some("Mola mola"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Poisson lune (Mola mola), Nusa Penida")
        );
        assert_eq!(
            meta.subject,
            Some(vec!["bali".to_string(), "nusa penida".to_string()])
        );
    }

    #[test]
    fn missing_properties_stay_unset() {
        let meta = parse(&xmp_packet(None, None, None));
        assert_eq!(meta, EmbeddedMetadata::default());
    }

    #[test]
    fn default_language_wins() {
        let packet = r#"<x:xmpmeta><rdf:RDF><rdf:Description>
            <dc:title><rdf:Alt>
                <rdf:li xml:lang="fr-FR">Raie manta</rdf:li>
                <rdf:li xml:lang="x-default">Manta ray</rdf:li>
            </rdf:Alt></dc:title>
        </rdf:Description></rdf:RDF></x:xmpmeta>"#;
        assert_eq!(parse(packet).title.as_deref(), Some("Manta ray"));
    }

    #[test]
    fn first_language_without_default() {
        let packet = r#"<x:xmpmeta><dc:title><rdf:Alt>
            <rdf:li xml:lang="fr-FR">Raie manta</rdf:li>
            <rdf:li xml:lang="en-US">Manta ray</rdf:li>
        </rdf:Alt></dc:title></x:xmpmeta>"#;
        assert_eq!(parse(packet).title.as_deref(), Some("Raie manta"));
    }

    #[test]
    fn attribute_form() {
        let packet = r#"<x:xmpmeta><rdf:Description rdf:about=""
            dc:title="Requin &amp; r&#233;mora"/></x:xmpmeta>"#;
        let meta = parse(packet);
        assert_eq!(meta.title.as_deref(), Some("Requin & rémora"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn empty_subject_bag_is_empty_list() {
        let packet = "<x:xmpmeta><dc:subject><rdf:Bag/></dc:subject></x:xmpmeta>";
        assert_eq!(parse(packet).subject, Some(vec![]));
    }

    #[test]
    fn does_not_confuse_similar_element_names() {
        let packet = "<x:xmpmeta><dc:titles>nope</dc:titles></x:xmpmeta>";
        assert_eq!(parse(packet).title, None);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &quot;c&quot;"), "a <b> \"c\"");
        assert_eq!(decode_entities("&#x263A;&#65;"), "☺A");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }
}
