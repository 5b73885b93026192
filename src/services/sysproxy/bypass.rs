//! 代理绕过列表合并

use std::collections::HashSet;

/// 本地及内网地址，始终绕过代理
pub const LAN_BYPASS: [&str; 21] = [
    "<local>",
    "localhost",
    "127.*",
    "10.*",
    "172.16.*",
    "172.17.*",
    "172.18.*",
    "172.19.*",
    "172.20.*",
    "172.21.*",
    "172.22.*",
    "172.23.*",
    "172.24.*",
    "172.25.*",
    "172.26.*",
    "172.27.*",
    "172.28.*",
    "172.29.*",
    "172.30.*",
    "172.31.*",
    "192.168.*",
];

/// 用户自定义条目在前、内网条目在后，按首次出现顺序去重后以 `;` 拼接
pub fn merge_bypass_list(custom: &[&str]) -> String {
    let mut seen = HashSet::new();
    custom
        .iter()
        .copied()
        .chain(LAN_BYPASS)
        .filter(|entry| seen.insert(*entry))
        .collect::<Vec<_>>()
        .join(";")
}
