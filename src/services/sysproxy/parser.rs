//! sysproxy 查询结果解析
//!
//! 查询输出格式：
//!
//! ```text
//! <flags><CR-LF>
//! <proxy-server><CR-LF>
//! <bypass-list><CR-LF>
//! <pac-url>
//! ```
//!
//! 缺省值以 `(null)` 表示。sysproxy 有时按 UTF-16LE 输出而调用方按 8 位文本解码，
//! 此时第一次拆分必然失败，需要把文本还原成字节后按 UTF-16LE 重新解码再拆一次。

use super::error::ProxyError;
use crate::models::ProxyBaseline;

/// WinINET 表示"无值"的字面量
pub const NULL_SENTINEL: &str = "(null)";

const LINE_SEPARATOR: &str = "\r\n";
const EXPECTED_FIELDS: usize = 4;

/// 解析查询输出，得到已记录的基线
pub fn parse_query_output(raw: &str) -> Result<ProxyBaseline, ProxyError> {
    let fields = match split_fields(raw) {
        Some(fields) => fields,
        None => {
            let bytes = narrow_bytes(raw);
            let redecoded = decode_utf16le(&bytes);
            match split_fields(&redecoded) {
                Some(fields) => {
                    tracing::debug!("sysproxy 查询结果按 UTF-16LE 重新解码后解析成功");
                    fields
                }
                None => {
                    return Err(ProxyError::QueryReturnMalformed {
                        hex: hex_dump(&bytes),
                    })
                }
            }
        }
    };

    let [flags, proxy_server, bypass_list, pac_url] = fields;
    Ok(ProxyBaseline::recorded(
        flags,
        non_null(proxy_server),
        non_null(bypass_list),
        non_null(pac_url),
    ))
}

/// 按 CRLF 拆分并去掉空段；段数不为 4 时返回 None
fn split_fields(text: &str) -> Option<[String; EXPECTED_FIELDS]> {
    let segments: Vec<String> = text
        .split(LINE_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    segments.try_into().ok()
}

fn non_null(value: String) -> Option<String> {
    if value == NULL_SENTINEL {
        None
    } else {
        Some(value)
    }
}

/// 每个字符收窄为一个字节（非 ASCII 字符变为 `?`）
pub fn narrow_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// 按 UTF-16LE 解码字节，非法代理对和末尾的单字节替换为 U+FFFD
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let chunks = bytes.chunks_exact(2);
    let has_trailing_byte = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    let mut text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if has_trailing_byte {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// 十六进制转储，形如 `31-00-0D-00`
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 模拟"UTF-16LE 输出被按 8 位解码"：每个字节变成一个字符
    fn as_misdecoded_utf16(text: &str) -> String {
        text.encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .map(char::from)
            .collect()
    }

    #[test]
    fn test_parse_well_formed() {
        let raw = "1\r\n(null)\r\n(null)\r\n(null)\r\n";
        let baseline = parse_query_output(raw).unwrap();

        assert!(baseline.recorded);
        assert_eq!(baseline.flags, "1");
        assert!(baseline.proxy_server.is_none());
        assert!(baseline.bypass_list.is_none());
        assert!(baseline.pac_url.is_none());
    }

    #[test]
    fn test_parse_values_verbatim() {
        let raw = "3\r\n10.0.0.1:8080\r\n*.local;<local>\r\nhttp://wpad/wpad.dat";
        let baseline = parse_query_output(raw).unwrap();

        assert_eq!(baseline.flags, "3");
        assert_eq!(baseline.proxy_server.as_deref(), Some("10.0.0.1:8080"));
        assert_eq!(baseline.bypass_list.as_deref(), Some("*.local;<local>"));
        assert_eq!(baseline.pac_url.as_deref(), Some("http://wpad/wpad.dat"));
    }

    #[test]
    fn test_leading_and_trailing_blank_lines_ignored() {
        let raw = "\r\n\r\n1\r\nproxy:80\r\n(null)\r\n(null)\r\n\r\n";
        let baseline = parse_query_output(raw).unwrap();
        assert_eq!(baseline.proxy_server.as_deref(), Some("proxy:80"));
    }

    #[test]
    fn test_sentinel_only_exact_match() {
        let raw = "1\r\n (null)\r\n(NULL)\r\n(null) ";
        let baseline = parse_query_output(raw).unwrap();

        assert_eq!(baseline.proxy_server.as_deref(), Some(" (null)"));
        assert_eq!(baseline.bypass_list.as_deref(), Some("(NULL)"));
        assert_eq!(baseline.pac_url.as_deref(), Some("(null) "));
    }

    #[test]
    fn test_utf16_fallback() {
        let expected = "1\r\n10.0.0.1:8080\r\n*.local\r\n(null)\r\n";
        let raw = as_misdecoded_utf16(expected);

        // 8 位解码下 CR 与 LF 之间夹着 NUL，第一次拆分得不到 4 段
        assert!(split_fields(&raw).is_none());

        let baseline = parse_query_output(&raw).unwrap();
        assert_eq!(baseline, parse_query_output(expected).unwrap());
        assert_eq!(baseline.proxy_server.as_deref(), Some("10.0.0.1:8080"));
        assert!(baseline.pac_url.is_none());
    }

    #[test]
    fn test_too_few_lines_is_malformed_with_hex() {
        let raw = "1\r\n(null)";
        match parse_query_output(raw) {
            Err(ProxyError::QueryReturnMalformed { hex }) => {
                assert_eq!(hex, "31-0D-0A-28-6E-75-6C-6C-29");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_too_many_lines_is_malformed() {
        let raw = "1\r\na\r\nb\r\nc\r\nd";
        let err = parse_query_output(raw).unwrap_err();
        assert_eq!(err.kind(), "QueryReturnMalformed");
    }

    #[test]
    fn test_misdecoded_with_wrong_line_count_is_malformed() {
        let raw = as_misdecoded_utf16("1\r\n(null)\r\n(null)");
        match parse_query_output(&raw) {
            Err(ProxyError::QueryReturnMalformed { hex }) => {
                assert!(hex.starts_with("31-00-0D-00-0A-00"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_does_not_count_as_field() {
        // 空行不计入字段，只剩 3 段
        let raw = "1\r\n\r\n*.local\r\n(null)";
        assert!(parse_query_output(raw).is_err());
    }

    #[test]
    fn test_narrow_bytes_replaces_non_ascii() {
        assert_eq!(narrow_bytes("a\u{4e2d}\0"), vec![b'a', b'?', 0]);
    }

    #[test]
    fn test_decode_utf16le_odd_length() {
        assert_eq!(decode_utf16le(&[b'h', 0, b'i', 0]), "hi");
        assert_eq!(decode_utf16le(&[b'h', 0, b'i']), "h\u{FFFD}");
    }

    #[test]
    fn test_hex_dump_format() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x0d, 0xff, 0x00]), "0D-FF-00");
    }
}
