use tubestream::nsolver::NSolver;

/// Obfuscated-looking transform with nested blocks, a lookup table declared
/// outside nothing (self-contained), try/catch and a loop, in the shape real
/// player scripts use.
const SCRIPT_A: &str = concat!(
    r#"Wka=function(a){var b=a.split(""),c=[function(d,e){d.splice(0,e)},function(d){d.reverse()},"#,
    r#"function(d,e){var f=d[0];d[0]=d[e%d.length];d[e%d.length]=f}];"#,
    r#"try{c[1](b,0);c[0](b,1);c[2](b,2)}catch(g){return a}"#,
    r#"return b.join("")};"#,
    "\n",
    r#"g.D&&(h=g.get("n"))&&(h=Wka(h),g.set("n",h));"#,
);

/// Same shape, different operation order; exercises the declaration probe
/// (no usage site present).
const SCRIPT_B: &str = concat!(
    r#"Qvb=function(a){var b=a.split("");"#,
    r#"var c={flip:function(d){d.reverse()},cut:function(d,e){d.splice(0,e)}};"#,
    r#"c.flip(b);c.cut(b,2);"#,
    r#"return b.join("")};"#,
);

#[test]
fn script_a_extracts_and_solves_known_inputs() {
    let solver = NSolver::from_player_js(SCRIPT_A);
    assert!(!solver.is_degraded());

    // "abcdef": reverse -> "fedcba", drop 1 -> "edcba", swap(0,2) -> "cdeba"
    assert_eq!(solver.solve("abcdef"), "cdeba");
    assert!(!solver.is_degraded());
}

#[test]
fn script_b_extracts_via_declaration_probe() {
    let solver = NSolver::from_player_js(SCRIPT_B);
    assert!(!solver.is_degraded());

    // "hello": reverse -> "olleh", drop 2 -> "leh"
    assert_eq!(solver.solve("hello"), "leh");
}

#[test]
fn rotation_scenario_replaces_value() {
    // A transform mapping "ABCDE" to "ZYXWV": reversed input appended after a
    // marker-free table lookup keeps the fixture honest about evaluation.
    let script = concat!(
        r#"Rot=function(a){var b=a.split("");var c={m:function(d){d.reverse()}};c.m(b);"#,
        r#"var e={A:"V",B:"W",C:"X",D:"Y",E:"Z"};"#,
        r#"for(var f=0;f<b.length;f++){b[f]=e[b[f]]||b[f]}"#,
        r#"return b.join("")};"#,
        "\n",
        r#"k.u&&(m=k.get("n"))&&(m=Rot(m),k.set("n",m));"#,
    );

    let solver = NSolver::from_player_js(script);
    assert!(!solver.is_degraded());
    assert_eq!(solver.solve("ABCDE"), "ZYXWV");
}

#[test]
fn unbalanced_script_degrades_cleanly() {
    let solver = NSolver::from_player_js(
        r#"Bad=function(a){var b=a.split(""); // never closes"#,
    );
    assert!(solver.is_degraded());
    assert_eq!(solver.solve("unchanged"), "unchanged");
}

#[test]
fn solved_values_differ_from_inputs() {
    let solver = NSolver::from_player_js(SCRIPT_A);
    let input = "nvalue12345";
    assert_ne!(solver.solve(input), input);
}
