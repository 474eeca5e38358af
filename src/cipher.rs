use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::structs::VideoError;
use crate::utils::{between, cut_after_js};

/// One elementary signature transform, recovered from the player script.
///
/// `Slice` and `Splice` differ in how the player implements them but both
/// drop the first `N` characters of the working array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherOp {
    Reverse,
    Slice(usize),
    Splice(usize),
    Swap(usize),
}

impl fmt::Display for CipherOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherOp::Reverse => write!(f, "r"),
            CipherOp::Slice(n) => write!(f, "s{n}"),
            CipherOp::Splice(n) => write!(f, "p{n}"),
            CipherOp::Swap(n) => write!(f, "w{n}"),
        }
    }
}

/// Signature transform recovered from one player script: the ordered op list
/// plus the signature timestamp the API wants echoed back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureCipher {
    ops: Vec<CipherOp>,
    timestamp: u64,
}

impl SignatureCipher {
    /// Extract both artifacts from the player script. A script without a
    /// recognizable transform yields an empty op list (not every stream
    /// carries a ciphered signature); a missing or non-5-digit timestamp
    /// yields 0.
    pub fn from_player_js(js: &str) -> Self {
        let timestamp = extract_signature_timestamp(js);

        let ops = match extract_ops(js) {
            Ok(ops) => ops,
            Err(err) => {
                tracing::debug!("signature transform not found: {err}");
                Vec::new()
            }
        };

        SignatureCipher { ops, timestamp }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn ops(&self) -> &[CipherOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replay the op list over a raw signature. Pure: same inputs, same
    /// output. An empty op list returns the signature unchanged.
    pub fn apply(&self, signature: &str) -> String {
        if self.ops.is_empty() {
            return signature.to_string();
        }

        let mut chars: Vec<char> = signature.chars().collect();

        for op in &self.ops {
            match op {
                CipherOp::Reverse => chars.reverse(),
                CipherOp::Slice(n) | CipherOp::Splice(n) => {
                    if *n < chars.len() {
                        chars.drain(..*n);
                    }
                }
                CipherOp::Swap(n) => {
                    if !chars.is_empty() {
                        let len = chars.len();
                        chars.swap(0, n % len);
                    }
                }
            }
        }

        chars.into_iter().collect()
    }
}

fn extract_signature_timestamp(js: &str) -> u64 {
    static STS_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
        [
            Regex::new(r"signatureTimestamp\s*[:=]\s*(\d+)").unwrap(),
            Regex::new(r#""STS"\s*[:=]\s*(\d+)"#).unwrap(),
            Regex::new(r"\bsts\s*[:=]\s*(\d+)").unwrap(),
        ]
    });

    for pattern in STS_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(js) {
            let digits = caps.get(1).map_or("", |m| m.as_str());
            if digits.len() == 5 {
                return digits.parse::<u64>().unwrap_or(0);
            }
        }
    }

    0
}

fn extract_ops(js: &str) -> Result<Vec<CipherOp>, VideoError> {
    let body = transform_function_body(js)?;

    // The first call after the split names the actions object.
    static ACTIONS_OBJ_NAME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"\.split\(""\);([a-zA-Z0-9_$]+)[.\[]"#).unwrap());

    let obj_name = ACTIONS_OBJ_NAME
        .captures(&body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            VideoError::PlayerParseFailed("transform body references no actions object".to_string())
        })?;

    let kinds = actions_object_kinds(js, &obj_name)?;

    // Calls take the shape `Obj.Method(a, N)` or `Obj["Method"](a, N)`;
    // reverse occasionally omits the numeric operand.
    static CALL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"([a-zA-Z0-9_$]+)(?:\.([a-zA-Z0-9_$]+)|\["([a-zA-Z0-9_$]+)"\])\(\s*[a-zA-Z0-9_$]+\s*(?:,\s*([^)\s]+)\s*)?\)"#,
        )
        .unwrap()
    });

    let mut ops = Vec::new();
    for caps in CALL.captures_iter(&body) {
        if caps.get(1).map(|m| m.as_str()) != Some(obj_name.as_str()) {
            continue;
        }

        let method = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let Some(kind) = kinds.iter().find(|(name, _)| name == method) else {
            continue;
        };

        // A malformed numeric operand skips this token only.
        let n = caps.get(4).and_then(|m| m.as_str().parse::<usize>().ok());

        let op = match (kind.1, n) {
            (OpKind::Reverse, _) => CipherOp::Reverse,
            (OpKind::Slice, Some(n)) => CipherOp::Slice(n),
            (OpKind::Splice, Some(n)) => CipherOp::Splice(n),
            (OpKind::Swap, Some(n)) => CipherOp::Swap(n),
            (_, None) => continue,
        };

        ops.push(op);
    }

    if ops.is_empty() {
        return Err(VideoError::PlayerParseFailed(
            "transform body contained no recognizable calls".to_string(),
        ));
    }

    Ok(ops)
}

/// Locate the transform function and return its body, probing the modern
/// usage site first, then the declaration pattern.
fn transform_function_body(js: &str) -> Result<String, VideoError> {
    let function_name = between(js, r#"a.set("alr","yes");c&&(c="#, "(decodeURIC");

    if !function_name.is_empty() {
        let function_start = format!("{function_name}=function(a)");
        if let Some(ndx) = js.find(function_start.as_str()) {
            let sub_body = &js[ndx + function_start.len()..];
            if let Some(body) = cut_after_js(sub_body) {
                return Ok(body.to_string());
            }
        }
    }

    static DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"[a-zA-Z0-9_$]+\s*=\s*function\(([a-zA-Z0-9_$]+)\)\{([a-zA-Z0-9_$]+)=([a-zA-Z0-9_$]+)\.split\(""\)"#,
        )
        .unwrap()
    });

    for caps in DECL.captures_iter(js) {
        // The argument must be the split target.
        let arg = caps.get(1).map(|m| m.as_str());
        if arg != caps.get(2).map(|m| m.as_str()) || arg != caps.get(3).map(|m| m.as_str()) {
            continue;
        }

        let m = caps.get(0).expect("whole match");
        let brace = js[m.start()..].find('{').unwrap_or(0);
        if let Some(body) = cut_after_js(&js[m.start() + brace..]) {
            return Ok(body.to_string());
        }
    }

    Err(VideoError::PlayerParseFailed(
        "signature transform function not found".to_string(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Reverse,
    Slice,
    Splice,
    Swap,
}

/// Parse the actions object and learn which method name implements which
/// primitive.
fn actions_object_kinds(js: &str, obj_name: &str) -> Result<Vec<(String, OpKind)>, VideoError> {
    let object_start = format!("var {obj_name}={{");
    let ndx = js
        .find(object_start.as_str())
        .or_else(|| {
            // Declarations are occasionally comma-chained.
            let alt = format!(",{obj_name}={{");
            js.find(alt.as_str())
        })
        .ok_or_else(|| {
            VideoError::PlayerParseFailed(format!("actions object {obj_name} not found"))
        })?;

    let brace = js[ndx..].find('{').unwrap_or(0);
    let object_body = cut_after_js(&js[ndx + brace..]).ok_or_else(|| {
        VideoError::PlayerParseFailed(format!("actions object {obj_name} never balances"))
    })?;

    static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"([a-zA-Z0-9_$]+)\s*:\s*function\(([^)]*)\)\s*\{([^}]*)\}"#).unwrap()
    });

    let mut kinds = Vec::new();
    for caps in METHOD.captures_iter(object_body) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        let kind = if body.contains("reverse") {
            OpKind::Reverse
        } else if body.contains("splice") {
            OpKind::Splice
        } else if body.contains("slice") {
            OpKind::Slice
        } else if body.contains('%') {
            OpKind::Swap
        } else {
            continue;
        };

        kinds.push((name.to_string(), kind));
    }

    if kinds.is_empty() {
        return Err(VideoError::PlayerParseFailed(format!(
            "actions object {obj_name} exposes no known primitives"
        )));
    }

    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_FIXTURE: &str = concat!(
        r#"var GxU={"#,
        r#"Dv0:function(a){a.reverse()},"#,
        r#"q8:function(a,b){a.splice(0,b)},"#,
        r#"tR:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},"#,
        r#"mL:function(a,b){return a.slice(b)}};"#,
        "\n",
        r#"kWa=function(a){a=a.split("");GxU.Dv0(a,7);GxU["q8"](a,2);GxU.tR(a,3);GxU.mL(a,1);return a.join("")};"#,
        "\n",
        r#"var sig=function(c){a.set("alr","yes");c&&(c=kWa(decodeURIComponent(c)))};"#,
        "\n",
        r#"var cfg={signatureTimestamp:19834,other:1};"#,
    );

    #[test]
    fn extracts_timestamp() {
        let cipher = SignatureCipher::from_player_js(PLAYER_FIXTURE);
        assert_eq!(cipher.timestamp(), 19834);
    }

    #[test]
    fn rejects_non_five_digit_timestamp() {
        let cipher = SignatureCipher::from_player_js("var a={signatureTimestamp:123456};");
        assert_eq!(cipher.timestamp(), 0);
    }

    #[test]
    fn extracts_op_list_in_source_order() {
        let cipher = SignatureCipher::from_player_js(PLAYER_FIXTURE);
        assert_eq!(
            cipher.ops(),
            &[
                CipherOp::Reverse,
                CipherOp::Splice(2),
                CipherOp::Swap(3),
                CipherOp::Slice(1),
            ]
        );
    }

    #[test]
    fn replay_matches_hand_computation() {
        let cipher = SignatureCipher::from_player_js(PLAYER_FIXTURE);

        // "abcdefgh" -> reverse -> "hgfedcba" -> drop 2 -> "fedcba"
        // -> swap(0, 3) -> "cedfba" -> drop 1 -> "edfba"
        assert_eq!(cipher.apply("abcdefgh"), "edfba");
    }

    #[test]
    fn replay_is_pure() {
        let cipher = SignatureCipher::from_player_js(PLAYER_FIXTURE);
        let a = cipher.apply("0123456789abcdef");
        let b = cipher.apply("0123456789abcdef");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_ops_return_signature_unchanged() {
        let cipher = SignatureCipher::default();
        assert_eq!(cipher.apply("unchanged"), "unchanged");
    }

    #[test]
    fn oversized_slice_and_swap_do_not_panic() {
        let cipher = SignatureCipher {
            ops: vec![CipherOp::Slice(100), CipherOp::Swap(100), CipherOp::Reverse],
            timestamp: 0,
        };
        assert_eq!(cipher.apply("ab"), "ba");
        assert_eq!(cipher.apply(""), "");
    }

    #[test]
    fn script_without_transform_yields_empty_ops() {
        let cipher = SignatureCipher::from_player_js("var noop=1;");
        assert!(cipher.is_empty());
        assert_eq!(cipher.apply("sig"), "sig");
    }
}
