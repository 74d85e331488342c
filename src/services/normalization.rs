//! 词形规范化
//!
//! 词典表中的词头可能以 NFC 或 NFD 存储，和教学词表不一定一致。
//! 所有匹配都基于"去首尾空白 + NFC"得到的匹配键。

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

pub fn nfc(s: &str) -> String {
    s.nfc().collect()
}

pub fn nfd(s: &str) -> String {
    s.nfd().collect()
}

/// 计算匹配键：去首尾空白后做 NFC
pub fn lemma_key(raw: &str) -> String {
    nfc(raw.trim())
}

/// 为一组匹配键生成查询变体
///
/// 每个键产生 {原样, NFC, NFD}（去首尾空白、去重），按首次出现的顺序返回。
pub fn query_variants<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut variants = Vec::new();

    for key in keys {
        let key = key.as_ref();
        for v in [key.to_string(), nfc(key), nfd(key)] {
            let v = v.trim().to_string();
            if !v.is_empty() && seen.insert(v.clone()) {
                variants.push(v);
            }
        }
    }

    variants
}
