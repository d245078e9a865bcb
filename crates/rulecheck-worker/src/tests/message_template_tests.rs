use super::*;

fn data(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn splits_quasis_and_placeholders() {
    assert_eq!(
        parse_message_template("Unexpected {{ name }} in {{kind}}."),
        vec![
            TemplatePart::Quasi("Unexpected "),
            TemplatePart::Interpolation {
                name: "name",
                raw: "{{ name }}"
            },
            TemplatePart::Quasi(" in "),
            TemplatePart::Interpolation {
                name: "kind",
                raw: "{{kind}}"
            },
            TemplatePart::Quasi("."),
        ]
    );
}

#[test]
fn braces_inside_a_placeholder_are_literal_text() {
    assert_eq!(
        parse_message_template("{{{a}}}"),
        vec![
            TemplatePart::Quasi("{"),
            TemplatePart::Interpolation {
                name: "a",
                raw: "{{a}}"
            },
            TemplatePart::Quasi("}"),
        ]
    );
    assert_eq!(
        parse_message_template("{{}} and {{a}"),
        vec![TemplatePart::Quasi("{{}} and {{a}")]
    );
}

#[test]
fn interpolation_keeps_unknown_keys() {
    let message = interpolate("'{{name}}' is not {{ expected }}", &data(&[("name", "foo")]));
    assert_eq!(message, "'foo' is not {{ expected }}");
}

#[test]
fn interpolation_without_placeholders_is_identity() {
    assert_eq!(interpolate("plain text", &IndexMap::new()), "plain text");
    assert_eq!(interpolate("", &IndexMap::new()), "");
}
