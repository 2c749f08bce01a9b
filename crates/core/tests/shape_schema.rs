//! Cross-checks `Shape::to_json_schema` against `Shape::admits`: for every
//! sample value, the exported schema and the in-process check must agree.

use bindpath_core::{Member, RecordShape, Shape, TemplatePart};
use serde_json::{json, Value};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn validator(shape: &Shape) -> jsonschema::Validator {
    let mut schema = shape.to_json_schema();
    if let Value::Object(map) = &mut schema {
        map.insert("$schema".into(), json!(DRAFT_2020_12));
    }
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("schema for {} does not compile: {}", shape, e))
}

fn assert_agree(shape: &Shape, samples: &[Value]) {
    let v = validator(shape);
    let mut disagreements = Vec::new();
    for sample in samples {
        let by_schema = v.is_valid(sample);
        let by_shape = shape.admits(sample);
        if by_schema != by_shape {
            disagreements.push(format!(
                "{}: schema says {}, admits says {}",
                sample, by_schema, by_shape
            ));
        }
    }
    assert!(
        disagreements.is_empty(),
        "disagreements for {}:\n{}",
        shape,
        disagreements.join("\n")
    );
}

fn company() -> Shape {
    let address = RecordShape::new()
        .with("street", Member::required(Shape::String))
        .with("houseNumber", Member::required(Shape::Number))
        .with("city", Member::required(Shape::String));
    let employee = RecordShape::named("Employee")
        .with("id", Member::required(Shape::Number))
        .with("name", Member::required(Shape::String));
    Shape::record(
        RecordShape::new()
            .with("name", Member::required(Shape::String))
            .with("address", Member::required(Shape::record(address)))
            .with("employees", Member::required(Shape::array(Shape::record(employee))))
            .with("nickname", Member::optional(Shape::String))
            .with(
                "parent",
                Member::required(Shape::union(vec![Shape::String, Shape::Null])),
            ),
    )
}

fn samples() -> Vec<Value> {
    vec![
        json!(null),
        json!(true),
        json!(1),
        json!("text"),
        json!("order_17"),
        json!("open"),
        json!([]),
        json!([1, 2]),
        json!(["a", 1]),
        json!([["a"], ["b", "c"]]),
        json!({}),
        json!({"name": "ACME", "address": {"street": "Main", "houseNumber": 4, "city": "X"},
               "employees": [{"id": 1, "name": "Jane"}], "parent": null}),
        json!({"name": "ACME", "address": {"street": "Main", "houseNumber": "4", "city": "X"},
               "employees": [], "parent": null}),
        json!({"name": "ACME", "address": {"street": "Main", "houseNumber": 4, "city": "X"},
               "employees": [], "parent": "Holding", "nickname": "A"}),
        json!({"name": "ACME", "address": {"street": "Main", "houseNumber": 4, "city": "X"},
               "employees": [{"id": "1", "name": "Jane"}], "parent": null}),
        json!({"name": "ACME", "employees": [], "parent": null}),
    ]
}

#[test]
fn primitives_agree() {
    for shape in [
        Shape::String,
        Shape::Number,
        Shape::Boolean,
        Shape::Null,
        Shape::Any,
        Shape::Object,
    ] {
        assert_agree(&shape, &samples());
    }
}

#[test]
fn literals_and_templates_agree() {
    let status = Shape::union(vec![
        Shape::StrLit("open".into()),
        Shape::StrLit("closed".into()),
    ]);
    assert_agree(&status, &samples());

    let order_id = Shape::Template(vec![
        TemplatePart::Text("order_".into()),
        TemplatePart::String,
    ]);
    assert_agree(&order_id, &samples());
    assert_agree(&Shape::BoolLit(true), &samples());
}

#[test]
fn records_agree() {
    assert_agree(&company(), &samples());
}

#[test]
fn arrays_and_tuples_agree() {
    assert_agree(&Shape::array(Shape::Number), &samples());
    assert_agree(&Shape::array(Shape::array(Shape::String)), &samples());
    assert_agree(&Shape::tuple(vec![Shape::String, Shape::Number]), &samples());
    assert_agree(
        &Shape::array(Shape::union(vec![Shape::String, Shape::Number])),
        &samples(),
    );
}

#[test]
fn unions_with_null_agree() {
    let nullable = Shape::union(vec![company(), Shape::Null]);
    assert_agree(&nullable, &samples());
}

#[test]
fn function_members_agree() {
    let placeholder = Shape::record(
        RecordShape::named("Placeholder")
            .with("placeholderString", Member::required(Shape::String))
            .with("placeholderFunction", Member::required(Shape::Function)),
    );
    let values = [
        json!({"placeholderString": "x"}),
        json!({"placeholderString": "x", "placeholderFunction": "f"}),
        json!({"placeholderFunction": null}),
        json!({}),
    ];
    assert_agree(&placeholder, &values);
    assert!(placeholder.admits(&values[0]));
}
