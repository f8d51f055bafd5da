//! End-to-end tests over fixtures shaped like the real source files:
//! a city list with dagger markers, a dict-style university map, a
//! demographics list with a trailing label, and a dict-style business
//! directory grouped by employee-size bucket.

use serde_json::{json, Value};

use citymerge_recon::aggregate::{aggregate, bucket_by_attr, share, Metric, MetricKind};
use citymerge_recon::dataset::{find_duplicate_keys, from_list, ExtractOptions};
use citymerge_recon::matcher::MatchPolicy;
use citymerge_recon::model::MatchTier;
use citymerge_recon::{join, run, Dataset, Entity, PipelineConfig, PipelineInput};

fn cities_value() -> Value {
    json!([
        {"city": "Saint Paul \u{2020}\u{2020}", "county": "Ramsey", "population": 311527},
        {"city": "Minneapolis", "county": "Hennepin", "population": 429954},
        {"city": "Duluth \u{2020}", "county": "St. Louis", "population": 86697},
        {"city": "Bemidji \u{2020}", "county": "Beltrami", "population": 15279},
        {"city": "Hibbing", "county": "St. Louis", "population": 16214},
    ])
}

fn universities_value() -> Value {
    json!({
        "St. Paul": ["Macalester College", "University of St. Thomas"],
        "Duluth": ["University of Minnesota Duluth"],
        "Bemidji": ["Bemidji State University"],
        "Winona": ["Winona State University"],
    })
}

fn demographics_value() -> Value {
    json!([
        {"city": "Saint Paul Demographic Statistics", "median_age": 32.5, "median_income": 63483},
        {"city": "Minneapolis Demographic Statistics", "median_age": 32.8, "median_income": 69397},
        {"city": "Duluth Demographic Statistics", "median_age": 33.8, "median_income": 56988},
    ])
}

fn businesses_value() -> Value {
    json!({
        "Saint Paul": {
            "500+": [
                {"name": "Ecolab", "industry": "Chemicals", "description": "Corporate Headquarters"},
                {"name": "Securian Financial", "industry": "Insurance", "description": "Corporate Headquarters"},
            ],
            "100-499": [
                {"name": "Summit Brewing", "industry": "Beverages", "description": "Brewery"},
            ],
        },
        "Minneapolis": {
            "500+": [
                {"name": "Target Corp HQ", "industry": "General Merchandise Stores", "description": "Corporate Headquarters"},
            ],
            "100-499": [],
        },
        "Hibbing": {
            "500+": [],
            "100-499": [],
        },
    })
}

const PIPELINE: &str = r#"
name = "MN city merge"
base = "cities"

[datasets.cities]
shape = "list"
file = "basic_cities.json"
name_field = "city"
markers = true

[datasets.universities]
shape = "dict"
file = "mn_uni_by_city.json"
payload_key = "universities"

[datasets.demographics]
shape = "list"
file = "mn_demo_full.json"
name_field = "city"
strip_suffix = "Demographic Statistics"

[datasets.businesses]
shape = "dict"
file = "city_businesses.json"
payload_key = "buckets"

[[steps]]
name = "attach_universities"
right = "universities"
tiers = ["exact_key"]
attach_as = "universities"
attach_field = "universities"

[[steps]]
name = "attach_demo"
right = "demographics"
tiers = ["exact_key", "substring"]

[[steps]]
name = "attach_businesses"
right = "businesses"
tiers = ["exact_key"]
attach_as = "businesses"
attach_field = "buckets"
"#;

fn pipeline_input() -> PipelineInput {
    PipelineInput::new()
        .with_dataset("cities", cities_value())
        .with_dataset("universities", universities_value())
        .with_dataset("demographics", demographics_value())
        .with_dataset("businesses", businesses_value())
}

#[test]
fn full_pipeline_merges_all_sources() {
    let config = PipelineConfig::from_toml(PIPELINE).unwrap();
    let result = run(&config, &pipeline_input()).unwrap();

    // All five cities retained, in base order, despite partial coverage.
    let names: Vec<&str> = result.entities.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Saint Paul", "Minneapolis", "Duluth", "Bemidji", "Hibbing"]
    );

    let sp = &result.entities[0];
    assert_eq!(sp.attributes["is_state_capital"], json!(true));
    assert_eq!(sp.attributes["is_county_seat"], json!(true));
    assert_eq!(sp.attributes["median_age"], json!(32.5));
    assert_eq!(
        sp.attributes["universities"],
        json!(["Macalester College", "University of St. Thomas"])
    );
    assert_eq!(sp.attributes["businesses"]["500+"][0]["name"], json!("Ecolab"));

    // Minneapolis: no university entry, everything else present.
    let mpls = &result.entities[1];
    assert!(mpls.attributes.get("universities").is_none());
    assert_eq!(mpls.attributes["median_income"], json!(69397));

    // Step reports carry the misses by name.
    assert_eq!(result.steps.len(), 3);
    let unis = &result.steps[0];
    assert_eq!(unis.matched, 3);
    assert_eq!(unis.unmatched_right_names, vec!["Winona"]);
    let demo = &result.steps[1];
    assert_eq!(demo.matched, 3);
    assert_eq!(demo.unmatched_left, 2);
    assert!(demo.unmatched_left_names.contains(&"Bemidji".to_string()));
}

#[test]
fn pipeline_reruns_byte_identical() {
    let config = PipelineConfig::from_toml(PIPELINE).unwrap();
    let a = run(&config, &pipeline_input()).unwrap();
    let b = run(&config, &pipeline_input()).unwrap();
    // Everything except the run timestamp must be byte-identical.
    assert_eq!(
        serde_json::to_string(&a.entities).unwrap(),
        serde_json::to_string(&b.entities).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&a.steps).unwrap(),
        serde_json::to_string(&b.steps).unwrap()
    );
}

#[test]
fn website_backfill_uses_all_three_tiers() {
    // Mirrors the website backfill: the curated business list and the
    // scraped directory disagree on names, so the join falls through from
    // exact key to substring to industry+description.
    let curated = Dataset::new(
        "curated",
        vec![
            Entity::new("Ecolab", obj(json!({"industry": "Chemicals", "description": "Corporate Headquarters"}))),
            Entity::new("Target", obj(json!({"industry": "General Merchandise Stores", "description": "Corporate Headquarters"}))),
            Entity::new("Acme Widgets", obj(json!({"industry": "Manufacturing", "description": "Plant"}))),
            Entity::new("Northern Grain", obj(json!({"industry": "Agriculture", "description": "Elevator"}))),
        ],
    );
    let scraped = Dataset::new(
        "scraped",
        vec![
            Entity::new("Ecolab", obj(json!({"website": "https://ecolab.com"}))),
            Entity::new("Target Corporation", obj(json!({"website": "https://target.com"}))),
            Entity::new("AW Holdings", obj(json!({"industry": "manufacturing", "description": "plant", "website": "https://aw.example"}))),
        ],
    );

    let policy = MatchPolicy {
        tiers: vec![MatchTier::ExactKey, MatchTier::Substring, MatchTier::AttributePair],
        attribute_pair: Some(("industry".into(), "description".into())),
    };
    let result = join(&curated, &scraped, &policy).unwrap();

    assert_eq!(result.matched.len(), 3);
    assert_eq!(result.matched[0].tier, MatchTier::ExactKey);
    assert_eq!(result.matched[1].tier, MatchTier::Substring);
    assert_eq!(result.matched[2].tier, MatchTier::AttributePair);
    assert_eq!(result.matched[2].right.attr_str("website"), "https://aw.example");
    assert_eq!(result.unmatched_left.len(), 1);
    assert_eq!(result.unmatched_left[0].display_name, "Northern Grain");
    assert!(result.unmatched_right.is_empty());
}

#[test]
fn business_report_rollup() {
    // Flatten the business directory into one entity per firm, then roll up
    // by size bucket and industry the way the reporting script does.
    let mut firms: Vec<Entity> = Vec::new();
    let directory = businesses_value();
    for (_, buckets) in directory.as_object().unwrap() {
        for (size, list) in buckets.as_object().unwrap() {
            for firm in list.as_array().unwrap() {
                let mut attrs = firm.as_object().cloned().unwrap();
                attrs.insert("employee_category".into(), json!(size));
                firms.push(Entity::new(
                    firm["name"].as_str().unwrap(),
                    attrs,
                ));
            }
        }
    }

    let metrics = vec![
        Metric { name: "firms".into(), kind: MetricKind::Count },
        Metric {
            name: "industries".into(),
            kind: MetricKind::Tally { attr: "industry".into() },
        },
    ];
    let by_size = aggregate(&firms, bucket_by_attr("employee_category"), &metrics);

    assert_eq!(by_size["500+"].counts["firms"], 3);
    assert_eq!(by_size["100-499"].counts["firms"], 1);

    let industries = &by_size["500+"].tallies["industries"];
    // Three industries, one firm each: tie broken by ascending label.
    assert_eq!(industries[0].label, "Chemicals");
    assert_eq!(industries[1].label, "General Merchandise Stores");
    assert_eq!(industries[2].label, "Insurance");

    // Share metric: 100-499 firms as a share of all firms.
    let total: u64 = by_size.values().map(|b| b.counts["firms"]).sum();
    assert_eq!(share(by_size["100-499"].counts["firms"] as f64, total as f64), 0.25);

    // Empty denominator is 0.0, not an error.
    assert_eq!(share(3.0, 0.0), 0.0);
}

#[test]
fn duplicate_spellings_detected_in_source() {
    let value = json!([
        {"city": "St. Paul"},
        {"city": "Saint Paul"},
        {"city": "Saint  Paul \u{2020}\u{2020}"},
        {"city": "Duluth"},
    ]);
    let opts = ExtractOptions {
        name_field: "city".into(),
        ..Default::default()
    };
    let ds = from_list("cities", &value, &opts).unwrap();
    let dupes = find_duplicate_keys(&ds);
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes["st paul"].len(), 3);
}

fn obj(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}
