use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

use tubestream::cipher::SignatureCipher;

/// Build a player-script fragment whose transform performs the given call
/// sequence, so extraction and replay are exercised together.
fn fixture_script(calls: &[(&str, usize)]) -> String {
    let call_body: String = calls
        .iter()
        .map(|(method, n)| format!("Qx.{method}(a,{n});"))
        .collect();

    format!(
        concat!(
            r#"var Qx={{"#,
            r#"rv:function(a){{a.reverse()}},"#,
            r#"sl:function(a,b){{return a.slice(b)}},"#,
            r#"sp:function(a,b){{a.splice(0,b)}},"#,
            r#"sw:function(a,b){{var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}}}};"#,
            "\n",
            r#"Twa=function(a){{a=a.split("");{calls}return a.join("")}};"#,
            "\n",
            r#"var use=function(c){{a.set("alr","yes");c&&(c=Twa(decodeURIComponent(c)))}};"#,
        ),
        calls = call_body,
    )
}

/// Straight-line reference implementation of the four primitives.
fn naive_replay(calls: &[(&str, usize)], signature: &str) -> String {
    let mut chars: Vec<char> = signature.chars().collect();

    for (method, n) in calls {
        match *method {
            "rv" => chars.reverse(),
            "sl" | "sp" => {
                if *n < chars.len() {
                    chars = chars.split_off(*n);
                }
            }
            "sw" => {
                if !chars.is_empty() {
                    let len = chars.len();
                    chars.swap(0, n % len);
                }
            }
            _ => unreachable!(),
        }
    }

    chars.into_iter().collect()
}

#[test]
fn elementary_tokens_match_reference_on_random_strings() {
    let mut rng = rand::thread_rng();

    let single_ops: [(&str, usize); 4] = [("rv", 0), ("sl", 3), ("sp", 5), ("sw", 7)];

    for op in single_ops {
        let calls = [op];
        let cipher = SignatureCipher::from_player_js(&fixture_script(&calls));
        assert!(!cipher.is_empty(), "extraction failed for {:?}", op);

        for _ in 0..2500 {
            let len = rng.gen_range(1..=256);
            let signature = Alphanumeric.sample_string(&mut rng, len);

            assert_eq!(
                cipher.apply(&signature),
                naive_replay(&calls, &signature),
                "op {:?} diverged on {:?}",
                op,
                signature
            );
        }
    }
}

#[test]
fn composed_sequences_match_reference() {
    let mut rng = rand::thread_rng();

    let calls = [("rv", 0), ("sw", 4), ("sp", 2), ("rv", 0), ("sl", 1), ("sw", 26)];
    let cipher = SignatureCipher::from_player_js(&fixture_script(&calls));
    assert_eq!(cipher.ops().len(), calls.len());

    for _ in 0..2500 {
        let len = rng.gen_range(1..=256);
        let signature = Alphanumeric.sample_string(&mut rng, len);

        assert_eq!(cipher.apply(&signature), naive_replay(&calls, &signature));
    }
}

#[test]
fn replay_is_deterministic() {
    let calls = [("rv", 0), ("sw", 3), ("sp", 1)];
    let cipher = SignatureCipher::from_player_js(&fixture_script(&calls));

    let out1 = cipher.apply("deterministic-input-0123456789");
    let out2 = cipher.apply("deterministic-input-0123456789");
    assert_eq!(out1, out2);
}
