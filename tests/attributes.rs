use off_the_record::attribute::{DefaultValue, Query, ReadWrite, Typecast};
use off_the_record::typecaster;
use off_the_record::{
    AttributeStore, EntryPoint, FeatureSet, Model, ModelHandle, Options, OtrError, ParamsInput,
    PermitEntry, Record, Result, Value,
};
use std::sync::Arc;

fn test_model() -> Arc<ModelHandle> {
    let mut model = ModelHandle::new("TestModel");
    model.set_param_key("test_model");
    model.attribute("first", Options::new()).unwrap();
    model
        .attribute("defaulted", Options::new().with_default("hello"))
        .unwrap();
    model
        .attribute("flag", Options::new().with_type("boolean"))
        .unwrap();
    model
        .attribute("count", Options::new().with_type("integer"))
        .unwrap();
    model
        .attribute("ratio", Options::new().with_type("float"))
        .unwrap();
    model
        .attribute("born_on", Options::new().with_type("date"))
        .unwrap();
    Arc::new(model)
}

fn params(pairs: &[(&str, Value)]) -> off_the_record::Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_undefaulted_attribute_reads_nil() {
    let record = Record::new(test_model());
    assert_eq!(record.get("first").unwrap(), Value::Nil);
    assert_eq!(record.get("count").unwrap(), Value::Nil);
}

#[test]
fn test_default_until_written_then_nil_sticks() {
    let mut record = Record::new(test_model());
    assert_eq!(record.get("defaulted").unwrap(), Value::from("hello"));

    record.set("defaulted", "bye").unwrap();
    assert_eq!(record.get("defaulted").unwrap(), Value::from("bye"));

    record.set("defaulted", Value::Nil).unwrap();
    assert_eq!(record.get("defaulted").unwrap(), Value::Nil);
}

#[test]
fn test_raw_read_round_trips() {
    let mut record = Record::new(test_model());
    for value in [
        Value::from("17"),
        Value::from(3.5),
        Value::from(true),
        Value::List(vec![Value::from(1)]),
    ] {
        record.set("count", value.clone()).unwrap();
        assert_eq!(record.get_before_type_cast("count").unwrap(), value);
    }
}

#[test]
fn test_boolean_coercion() {
    let mut record = Record::new(test_model());
    for truthy in [Value::from(true), Value::from("1"), Value::from("yes"), Value::from(2)] {
        record.set("flag", truthy.clone()).unwrap();
        assert_eq!(record.get("flag").unwrap(), Value::Bool(true), "{truthy:?}");
    }
    for falsey in [
        Value::from(false),
        Value::from("0"),
        Value::from("off"),
        Value::from("FALSE"),
        Value::from("f"),
        Value::from(0),
        Value::List(vec![]),
        Value::Map(off_the_record::Params::new()),
    ] {
        record.set("flag", falsey.clone()).unwrap();
        assert_eq!(record.get("flag").unwrap(), Value::Bool(false), "{falsey:?}");
    }
}

#[test]
fn test_numeric_coercion_never_errors() {
    let mut record = Record::new(test_model());
    record.set("count", "17").unwrap();
    assert_eq!(record.get("count").unwrap(), Value::Int(17));

    record.set("count", "X").unwrap();
    assert_eq!(record.get("count").unwrap(), Value::Nil);
    assert_eq!(record.get_before_type_cast("count").unwrap(), Value::from("X"));

    record.set("ratio", "2.5").unwrap();
    assert_eq!(record.get("ratio").unwrap(), Value::Float(2.5));
}

#[test]
fn test_date_coercion() {
    let mut record = Record::new(test_model());
    record.set("born_on", "2024-02-29").unwrap();
    let expected = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(record.get("born_on").unwrap(), Value::Date(expected));

    record.set("born_on", "not a date").unwrap();
    assert_eq!(record.get("born_on").unwrap(), Value::Nil);
}

#[test]
fn test_predicate() {
    let mut record = Record::new(test_model());
    assert!(!record.query("first").unwrap());
    for blank in [Value::Nil, Value::from(false), Value::from("   ")] {
        record.set("first", blank.clone()).unwrap();
        assert!(!record.query("first").unwrap(), "{blank:?}");
    }
    for present in [Value::from("x"), Value::from(0), Value::from(true)] {
        record.set("first", present.clone()).unwrap();
        assert!(record.query("first").unwrap(), "{present:?}");
    }
}

#[test]
fn test_predicate_sees_default_and_cast() {
    let mut record = Record::new(test_model());
    assert!(record.query("defaulted").unwrap());

    record.set("flag", "off").unwrap();
    assert!(!record.query("flag").unwrap());
}

#[test]
fn test_duplicate_attribute() {
    let mut model = ModelHandle::new("TestModel");
    model.attribute("first", Options::new()).unwrap();
    let err = model.attribute("first", Options::new()).unwrap_err();
    assert!(matches!(err, OtrError::DuplicateAttribute(ref name) if name == "first"));
}

#[test]
fn test_unrecognized_option_names_the_key() {
    let mut model = ModelHandle::new("TestModel");
    let err = model
        .attribute("first", Options::new().with("bogus", true))
        .unwrap_err();
    assert!(err.to_string().contains("bogus"));
    assert!(matches!(err, OtrError::UnrecognizedOptions { ref keys, .. } if keys == &["bogus"]));
}

#[test]
fn test_permit_list_contains_each_name_once() {
    let mut model = ModelHandle::new("TestModel");
    model.attribute("a", Options::new()).unwrap();
    model.attribute("b", Options::new()).unwrap();
    model.permit(["c"]);
    model.permit(["a", "c"]);
    assert_eq!(
        model.permit_filters(),
        vec![
            PermitEntry::name("a"),
            PermitEntry::name("b"),
            PermitEntry::name("c")
        ]
    );
}

#[test]
fn test_unpermitted_input_is_forbidden() {
    let model = test_model();
    let input = ParamsInput::scoped("test_model", params(&[("first", Value::from("Ada"))]));
    let err = Record::from_input(model, &input).unwrap_err();
    match err {
        OtrError::ForbiddenAttributes(forbidden) => assert_eq!(forbidden.key, "test_model"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_permitted_subset_assigns_only_those_keys() {
    let model = test_model();
    let input = ParamsInput::scoped("test_model", params(&[
        ("first", Value::from("Ada")),
        ("count", Value::from("3")),
        ("admin", Value::from(true)),
    ]))
    .permit(["first", "admin"]);

    let record = Record::from_input(model, &input).unwrap();
    assert_eq!(record.get("first").unwrap(), Value::from("Ada"));
    assert_eq!(record.get("count").unwrap(), Value::Nil);
    assert!(!record.attributes().contains("count"));
    assert!(!record.attributes().contains("admin"));
}

#[test]
fn test_permit_all_respects_model_grants() {
    let model = test_model();
    let input = ParamsInput::scoped("test_model", params(&[
        ("count", Value::from("3")),
        ("admin", Value::from(true)),
    ]))
    .permit_all();

    let record = Record::from_input(model, &input).unwrap();
    assert_eq!(record.get("count").unwrap(), Value::Int(3));
    assert_eq!(record.attributes().len(), 1);
}

fn bypassing_model() -> ModelHandle {
    let mut model = ModelHandle::new("TestModel");
    model.set_param_key("test_model");
    model.attribute("first", Options::new()).unwrap();
    model
        .host_setter("bypassing", |store: &mut AttributeStore, value| {
            store.insert("bypassing", value);
            Ok(())
        })
        .unwrap();
    model
}

#[test]
fn test_mass_assignment_reaches_setters_outside_declarations() {
    let model = Arc::new(bypassing_model());
    let values = params(&[("bypassing", Value::from(5))]);

    let built = Record::with_params(Arc::clone(&model), Some(&values)).unwrap();
    assert_eq!(built.attributes().get("bypassing"), Some(&Value::Int(5)));

    let mut assigned = Record::new(model);
    assigned.assign(Some(&values)).unwrap();
    assert_eq!(assigned.attributes().get("bypassing"), Some(&Value::Int(5)));
}

#[test]
fn test_host_setter_needs_an_explicit_grant_for_input() {
    let values = params(&[("first", Value::from("Ada")), ("bypassing", Value::from(5))]);

    let input = ParamsInput::scoped("test_model", values).permit_all();
    let record = Record::from_input(Arc::new(bypassing_model()), &input).unwrap();
    assert!(!record.attributes().contains("bypassing"));
    assert_eq!(record.get("first").unwrap(), Value::from("Ada"));

    let mut granted = bypassing_model();
    granted.permit(["bypassing"]);
    let record = Record::from_input(Arc::new(granted), &input).unwrap();
    assert_eq!(record.attributes().get("bypassing"), Some(&Value::Int(5)));
}

#[test]
fn test_input_is_scoped_by_param_key() {
    let body = params(&[
        ("test_model", Value::Map(params(&[("count", Value::from("3"))]))),
        ("count", Value::from("9")),
    ]);
    let input = ParamsInput::new(body).permit_all();
    let record = Record::from_input(test_model(), &input).unwrap();
    assert_eq!(record.get("count").unwrap(), Value::Int(3));
}

#[test]
fn test_reordered_features_still_apply_defaults() {
    let features = FeatureSet::new(vec![
        Arc::new(ReadWrite),
        Arc::new(DefaultValue),
        Arc::new(Query),
        Arc::new(Typecast),
    ]);
    let mut model = ModelHandle::with_features("Reordered", features);
    model
        .attribute("count", Options::new().with_default("5").with_type("integer"))
        .unwrap();
    let mut record = Record::new(Arc::new(model));

    assert_eq!(record.get("count").unwrap(), Value::Int(5));
    record.set("count", Value::Nil).unwrap();
    assert_eq!(record.get("count").unwrap(), Value::Nil);
}

#[test]
fn test_removing_query_feature_removes_predicate() {
    let features = FeatureSet::new(vec![
        Arc::new(DefaultValue),
        Arc::new(ReadWrite),
        Arc::new(Typecast),
    ]);
    let mut model = ModelHandle::with_features("NoQuery", features);
    model.attribute("first", Options::new()).unwrap();
    let mut record = Record::new(Arc::new(model));

    assert!(!record.respond_to("first?"));
    let err = record.query("first").unwrap_err();
    assert!(matches!(
        err,
        OtrError::NoAccessor {
            entry: EntryPoint::Query,
            ..
        }
    ));
    let err = record.invoke("first?", None).unwrap_err();
    assert!(matches!(err, OtrError::NoAccessor { .. }));
}

#[test]
fn test_typecaster_override_is_per_model() {
    let mut shouting = ModelHandle::new("Shouting");
    shouting.register_typecaster(
        "string",
        Arc::new(|v: &Value| Value::Str(v.to_string().to_uppercase())),
    );
    shouting
        .attribute("name", Options::new().with_type("string"))
        .unwrap();

    let mut plain = ModelHandle::new("Plain");
    plain
        .attribute("name", Options::new().with_type("string"))
        .unwrap();

    let mut loud = Record::new(Arc::new(shouting));
    let mut quiet = Record::new(Arc::new(plain));
    loud.set("name", "ada").unwrap();
    quiet.set("name", "ada").unwrap();

    assert_eq!(loud.get("name").unwrap(), Value::from("ADA"));
    assert_eq!(quiet.get("name").unwrap(), Value::from("ada"));
    assert_eq!(typecaster::cast_string(&Value::from("ada")), Value::from("ada"));
}

#[test]
fn test_unknown_type_tag_fails_on_read() {
    let mut model = ModelHandle::new("Money");
    model
        .attribute("price", Options::new().with_type("money"))
        .unwrap();
    let mut record = Record::new(Arc::new(model));
    record.set("price", "12").unwrap();

    assert!(matches!(
        record.get("price"),
        Err(OtrError::UnknownTypeTag { .. })
    ));
    assert_eq!(record.get_before_type_cast("price").unwrap(), Value::from("12"));
}

struct Person;

impl Model for Person {
    const NAME: &'static str = "Person";

    fn define(model: &mut ModelHandle) -> Result<()> {
        model.set_param_key("person");
        model.attribute("name", Options::new())?;
        model.attribute("age", Options::new().with_type("integer"))?;
        model.permit([PermitEntry::nested("address", vec!["street".into()])]);
        Ok(())
    }
}

#[test]
fn test_registry_returns_same_handle() {
    let a = Person::handle().unwrap();
    let b = Person::handle().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.param_key(), "person");
}

#[test]
fn test_registry_records_share_definition_not_state() {
    let mut one = Person::new_record().unwrap();
    let two = Person::new_record().unwrap();
    one.set("age", "41").unwrap();
    assert_eq!(one.get("age").unwrap(), Value::Int(41));
    assert_eq!(two.get("age").unwrap(), Value::Nil);
}
