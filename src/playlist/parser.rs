//! Line-oriented M3U8 playlist parser.
//!
//! The parser is a single pass over the playlist lines. Two pieces of state
//! carry over between lines: the most recent `#EXT-X-KEY` (applied to every
//! following segment) and the most recent `#EXTINF` duration. Nothing is
//! fetched here; resolving keys and nested playlists happens in `download`.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::playlist::types::{
    EncryptionMeta, EncryptionMethod, Manifest, MasterPlaylist, MediaPlaylist, PlaylistType,
    Resolution, Segment, VariantStream,
};
use crate::playlist::url::{parse_base_url, resolve_url};

const HEADER: &str = "#EXTM3U";
const STREAM_INF: &str = "#EXT-X-STREAM-INF:";
const KEY: &str = "#EXT-X-KEY";
const PLAYLIST_TYPE: &str = "#EXT-X-PLAYLIST-TYPE";
const EXTINF: &str = "#EXTINF";
const MEDIA_SEQUENCE: &str = "#EXT-X-MEDIA-SEQUENCE";
const ENDLIST: &str = "#EXT-X-ENDLIST";

/// Marker at the end of a line that is continued on the next one.
const CONTINUATION: &str = " \\";

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Z0-9-]+)=("[^"\r\n]*"|[^",\s]+)"#).expect("attribute pattern is valid")
    })
}

/// Parse raw playlist text fetched from `playlist_url`.
pub fn parse_playlist(content: &str, playlist_url: &str) -> Result<Manifest> {
    let base = parse_base_url(playlist_url)?;
    let lines: Vec<&str> = content.lines().collect();
    parse_lines(&lines, &base)
}

/// Parse playlist lines. `base` is the URL the playlist was fetched from and
/// is used to resolve every relative URI in it.
pub fn parse_lines<S: AsRef<str>>(lines: &[S], base: &Url) -> Result<Manifest> {
    let first = lines
        .first()
        .map(|l| l.as_ref().trim_start_matches('\u{feff}').trim())
        .unwrap_or_default();
    if first != HEADER {
        return Err(malformed(0, first, "not begin with #EXTM3U"));
    }

    let mut variants: Vec<VariantStream> = Vec::new();
    let mut media = MediaPlaylist::default();
    let mut encryption = EncryptionMeta::default();
    let mut duration = Duration::ZERO;

    let mut i = 1;
    while i < lines.len() {
        let line = lines[i].as_ref().trim();

        if line.is_empty() {
            // blank
        } else if !line.starts_with('#') {
            if !variants.is_empty() {
                return Err(malformed(i, line, "segment URI inside a master playlist"));
            }
            let url = resolve_url(base, line)
                .map_err(|e| malformed(i, line, format!("ts file url is illegal, {}", e)))?;
            let index = media.segments.len();
            media.segments.push(Segment {
                index,
                url,
                duration,
                sequence: media.media_sequence.saturating_add(index as u64),
                encryption: encryption.clone(),
                error_message: String::new(),
            });
        } else if !line.starts_with("#EXT") {
            // comment
        } else if line.starts_with(STREAM_INF) {
            if !media.segments.is_empty() {
                return Err(malformed(i, line, "variant stream inside a media playlist"));
            }
            let start = i;
            let tag = join_continued(lines, &mut i);
            let mut variant = parse_stream_inf(start, &tag)?;

            i += 1;
            let uri = lines.get(i).map(|l| l.as_ref().trim()).unwrap_or_default();
            if uri.is_empty() || uri.starts_with('#') {
                return Err(malformed(i, uri, "EXT-X-STREAM-INF is not followed by a URI"));
            }
            variant.manifest_url = resolve_url(base, uri)
                .map_err(|e| malformed(i, uri, format!("sub m3u8 url is illegal, {}", e)))?;
            variants.push(variant);
        } else if line.starts_with(KEY) {
            let start = i;
            let tag = join_continued(lines, &mut i);
            encryption = parse_key(start, &tag, base)?;
        } else if line.starts_with(PLAYLIST_TYPE) {
            let value = tag_value(i, line, "EXT-X-PLAYLIST-TYPE")?;
            let playlist_type = value
                .parse::<PlaylistType>()
                .map_err(|e| malformed(i, line, format!("EXT-X-PLAYLIST-TYPE is illegal, {}", e)))?;
            media.playlist_type = Some(playlist_type);
        } else if line.starts_with(EXTINF) {
            duration = parse_extinf(i, line)?;
        } else if line.starts_with(MEDIA_SEQUENCE) {
            let value = tag_value(i, line, "EXT-X-MEDIA-SEQUENCE")?;
            media.media_sequence = value.parse::<u64>().map_err(|e| {
                malformed(i, line, format!("EXT-X-MEDIA-SEQUENCE is illegal, {}", e))
            })?;
        } else if line.starts_with(ENDLIST) {
            if line != ENDLIST {
                return Err(malformed(i, line, "EXT-X-ENDLIST is illegal"));
            }
            media.end_list = true;
        }

        i += 1;
    }

    if variants.is_empty() {
        Ok(Manifest::Media(media))
    } else {
        Ok(Manifest::Master(MasterPlaylist { variants }))
    }
}

/// Join a tag with the lines that continue it. On return `i` points at the
/// last physical line consumed.
fn join_continued<S: AsRef<str>>(lines: &[S], i: &mut usize) -> String {
    let mut tag = lines[*i].as_ref().trim().to_string();
    while tag.ends_with(CONTINUATION) {
        tag.truncate(tag.len() - CONTINUATION.len());
        if *i + 1 >= lines.len() {
            break;
        }
        *i += 1;
        tag.push_str(lines[*i].as_ref().trim());
    }
    tag
}

/// Extract `KEY=value` attributes, stripping quotes from quoted values.
fn attributes(tag: &str) -> HashMap<&str, &str> {
    attribute_pattern()
        .captures_iter(tag)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str().trim_matches('"');
            Some((key, value))
        })
        .collect()
}

fn parse_stream_inf(line_no: usize, tag: &str) -> Result<VariantStream> {
    let attrs = attributes(tag);
    let mut variant = VariantStream::default();

    if let Some(v) = attrs.get("PROGRAM-ID") {
        variant.program_id = v
            .parse()
            .map_err(|e| malformed(line_no, tag, format!("PROGRAM-ID {} is not a number, {}", v, e)))?;
    }
    if let Some(v) = attrs.get("BANDWIDTH") {
        variant.bandwidth = v
            .parse()
            .map_err(|e| malformed(line_no, tag, format!("BANDWIDTH {} is not a number, {}", v, e)))?;
    }
    if let Some(v) = attrs.get("RESOLUTION") {
        variant.resolution = parse_resolution(v)
            .ok_or_else(|| malformed(line_no, tag, format!("RESOLUTION {} is illegal", v)))?;
    }

    Ok(variant)
}

fn parse_resolution(value: &str) -> Option<Resolution> {
    let (width, height) = value.split_once('x')?;
    Some(Resolution {
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}

fn parse_key(line_no: usize, tag: &str, base: &Url) -> Result<EncryptionMeta> {
    let attrs = attributes(tag);
    let mut meta = EncryptionMeta::default();

    if let Some(v) = attrs.get("METHOD") {
        meta.method = v
            .parse()
            .map_err(|e: String| malformed(line_no, tag, e))?;
    }
    if let Some(v) = attrs.get("URI") {
        meta.key_url = resolve_url(base, v)
            .map_err(|e| malformed(line_no, tag, format!("URI {} is illegal, {}", v, e)))?;
    }
    if let Some(v) = attrs.get("IV") {
        meta.iv = v.to_string();
    }

    if meta.method == EncryptionMethod::None {
        meta.key_url.clear();
        meta.iv.clear();
    }

    Ok(meta)
}

fn parse_extinf(line_no: usize, line: &str) -> Result<Duration> {
    let value = tag_value(line_no, line, "EXTINF")?;
    let seconds = value.split(',').next().unwrap_or_default().trim();
    let seconds: f64 = seconds
        .parse()
        .map_err(|e| malformed(line_no, line, format!("EXTINF is illegal, {}", e)))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| malformed(line_no, line, format!("EXTINF is illegal, {}", e)))
}

/// The text after the first `:` of a tag line.
fn tag_value<'a>(line_no: usize, line: &'a str, tag: &str) -> Result<&'a str> {
    line.split_once(':')
        .map(|(_, value)| value.trim())
        .ok_or_else(|| malformed(line_no, line, format!("{} has no value", tag)))
}

fn malformed(line: usize, text: &str, reason: impl Into<String>) -> Error {
    Error::MalformedManifest {
        line,
        text: text.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=150000,RESOLUTION=416x234,CODECS="avc1.42e00a,mp4a.40.2"
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=240000,RESOLUTION=416x234,CODECS="avc1.42e00a,mp4a.40.2"
https://example.com/lo_mid/index.m3u8
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=640000,RESOLUTION=640x360,CODECS="avc1.42e00a,mp4a.40.2"
//example.com/high/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=64000,CODECS="mp4a.40.5"
http://example.com/audio/index.m3u8"#;

    const MEDIA: &str = r#"#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-PLAYLIST-TYPE:VOD
#EXT-X-MEDIA-SEQUENCE:250
#EXT-X-KEY:METHOD=AES-128,URI="http://example.com/hls/key.key"
#EXTINF:3,
hls/nfTcXY3x.ts
#EXTINF:1.52,
/hls/VtMpEYqz.ts
# a plain comment
#EXT-X-KEY:METHOD=NONE
#EXTINF:3,
http://example.com/hls/uqvfZRwE.ts
#EXT-X-ENDLIST
"#;

    fn media(manifest: Manifest) -> MediaPlaylist {
        match manifest {
            Manifest::Media(media) => media,
            Manifest::Master(_) => panic!("expected a media playlist"),
        }
    }

    fn master(manifest: Manifest) -> MasterPlaylist {
        match manifest {
            Manifest::Master(master) => master,
            Manifest::Media(_) => panic!("expected a master playlist"),
        }
    }

    fn line_of(err: Error) -> usize {
        match err {
            Error::MalformedManifest { line, .. } => line,
            other => panic!("expected MalformedManifest, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_master_playlist() {
        let playlist = master(parse_playlist(MASTER, "http://example.com/").unwrap());

        let urls: Vec<&str> = playlist
            .variants
            .iter()
            .map(|v| v.manifest_url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://example.com/low/index.m3u8",
                "https://example.com/lo_mid/index.m3u8",
                "http://example.com/high/index.m3u8",
                "http://example.com/audio/index.m3u8",
            ]
        );
        assert_eq!(playlist.variants[2].program_id, 1);
        assert_eq!(playlist.variants[2].bandwidth, 640_000);
        assert_eq!(playlist.variants[2].resolution.to_string(), "640x360");
        assert_eq!(playlist.variants[3].resolution, Resolution::default());
    }

    #[test]
    fn test_parse_media_playlist() {
        let playlist = media(parse_playlist(MEDIA, "http://example.com/").unwrap());

        assert_eq!(playlist.playlist_type, Some(PlaylistType::Vod));
        assert_eq!(playlist.media_sequence, 250);
        assert!(playlist.end_list);
        assert_eq!(playlist.segments.len(), 3);

        let indexes: Vec<usize> = playlist.segments.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        let sequences: Vec<u64> = playlist.segments.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![250, 251, 252]);

        let first = &playlist.segments[0];
        assert_eq!(first.url, "http://example.com/hls/nfTcXY3x.ts");
        assert_eq!(first.duration, Duration::from_secs(3));
        assert_eq!(first.encryption.method, EncryptionMethod::Aes128);
        assert_eq!(first.encryption.key_url, "http://example.com/hls/key.key");
        assert!(first.encryption.key.is_empty());

        assert_eq!(playlist.segments[1].duration, Duration::from_millis(1520));
        assert!(playlist.segments[1].is_encrypted());
        assert!(!playlist.segments[2].is_encrypted());
    }

    #[test]
    fn test_single_segment_with_media_sequence() {
        let content = "#EXTM3U\n#EXT-X-MEDIA-SEQUENCE:250\n#EXTINF:3,\nseg.ts";
        let playlist = media(parse_playlist(content, "http://x/live/index.m3u8").unwrap());

        assert_eq!(playlist.segments.len(), 1);
        let segment = &playlist.segments[0];
        assert_eq!(segment.index, 0);
        assert_eq!(segment.sequence, 250);
        assert_eq!(segment.duration, Duration::from_secs(3));
        assert_eq!(segment.url, "http://x/live/seg.ts");
    }

    #[test]
    fn test_default_sequence_starts_at_zero() {
        let content = "#EXTM3U\na.ts\nb.ts\n";
        let playlist = media(parse_playlist(content, "http://x/").unwrap());
        let sequences: Vec<u64> = playlist.segments.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    #[test]
    fn test_stream_inf_continuation() {
        for uri in ["hi.m3u8", "http://x/v/hi.m3u8", "//x/v/hi.m3u8"] {
            let content = format!(
                "#EXTM3U\n#EXT-X-STREAM-INF:PROGRAM-ID=1, \\\nBANDWIDTH=640000,RESOLUTION=640x360\n{}\n",
                uri
            );
            let playlist = master(parse_playlist(&content, "http://x/v/master.m3u8").unwrap());
            assert_eq!(playlist.variants.len(), 1);
            let variant = &playlist.variants[0];
            assert_eq!(variant.manifest_url, "http://x/v/hi.m3u8");
            assert_eq!(variant.bandwidth, 640_000);
            assert_eq!(variant.resolution.width, 640);
        }
    }

    #[test]
    fn test_key_continuation_and_iv() {
        let content = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128, \\\nURI=\"k.bin\",IV=0x000102030405060708090a0b0c0d0e0f\nseg.ts\n";
        let playlist = media(parse_playlist(content, "http://x/v/index.m3u8").unwrap());
        let meta = &playlist.segments[0].encryption;
        assert_eq!(meta.key_url, "http://x/v/k.bin");
        assert_eq!(meta.iv, "0x000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn test_missing_header() {
        let err = parse_playlist("#EXTINF:3,\nseg.ts", "http://x/").unwrap_err();
        assert_eq!(line_of(err), 0);
        assert!(parse_playlist("", "http://x/").is_err());
        assert!(parse_playlist("\u{feff}#EXTM3U \nseg.ts", "http://x/").is_ok());
    }

    #[test]
    fn test_unknown_encrypt_method() {
        let content = "#EXTM3U\n#EXTINF:3,\na.ts\n#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"k\"\nb.ts";
        let err = parse_playlist(content, "http://x/").unwrap_err();
        assert_eq!(line_of(err), 3);
    }

    #[test]
    fn test_malformed_values_report_line() {
        let cases = [
            ("#EXTM3U\n#EXTINF:abc,\na.ts", 1),
            ("#EXTM3U\n#EXTINF:-1,\na.ts", 1),
            ("#EXTM3U\n\n#EXT-X-MEDIA-SEQUENCE:x", 2),
            ("#EXTM3U\n#EXT-X-PLAYLIST-TYPE:LIVE", 1),
            ("#EXTM3U\na.ts\n#EXT-X-ENDLIST:yes", 2),
            ("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=abc\nv.m3u8", 1),
            ("#EXTM3U\n#EXT-X-STREAM-INF:RESOLUTION=640\nv.m3u8", 1),
        ];
        for (content, line) in cases {
            let err = parse_playlist(content, "http://x/").unwrap_err();
            assert_eq!(line_of(err), line, "content: {:?}", content);
        }
    }

    #[test]
    fn test_dangling_stream_inf() {
        let err = parse_playlist("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1", "http://x/").unwrap_err();
        assert_eq!(line_of(err), 2);

        let content = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n#EXT-X-STREAM-INF:BANDWIDTH=2\nv.m3u8";
        let err = parse_playlist(content, "http://x/").unwrap_err();
        assert_eq!(line_of(err), 2);
    }

    #[test]
    fn test_mixed_playlist_rejected() {
        let content = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nv.m3u8\nseg.ts";
        let err = parse_playlist(content, "http://x/").unwrap_err();
        assert_eq!(line_of(err), 3);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_playlist(MEDIA, "http://example.com/").unwrap();
        let b = parse_playlist(MEDIA, "http://example.com/").unwrap();
        assert_eq!(a, b);
    }
}
