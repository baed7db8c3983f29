//! Integration tests for the embedded default rules.

use serde_json::json;
use std::sync::Arc;
use viz_style_rules::merge::is_function_ref;
use viz_style_rules::registry::RuleRegistry;
use viz_style_rules::resolver::{FailurePolicy, MapDependencies, NoDependencies, Resolver};
use viz_style_rules::rules::{DEFAULT_LOCALE, RuleSet, Target};

fn builtin() -> RuleSet {
    RuleSet::builtin().expect("embedded rules must load")
}

fn environment(locale: &str) -> MapDependencies {
    MapDependencies::new().with("environment", json!({"locale": locale}))
}

#[test]
fn det_abstract_is_not_selectable() {
    let rules = builtin();
    let resolver = Resolver::new();

    let det = Target::new("pentaho/ccc/visual/Abstract").with_application("pentaho/det");
    let resolved = resolver.resolve(&det, &rules, &NoDependencies).unwrap();
    assert_eq!(resolved.pointer("/extension/selectable"), Some(&json!(false)));
    assert_eq!(resolved.pointer("/extension/legendPosition"), Some(&json!("top")));

    let analyzer = Target::new("pentaho/ccc/visual/Abstract").with_application("pentaho/analyzer");
    let resolved = resolver.resolve(&analyzer, &rules, &NoDependencies).unwrap();
    assert_eq!(resolved.pointer("/extension/selectable"), Some(&json!(true)));
    assert_eq!(resolved.pointer("/extension/legendPosition"), None);
}

#[test]
fn legend_label_is_a_function_reference() {
    let resolved = Resolver::new()
        .resolve(&Target::new("pentaho/ccc/visual/Abstract"), &builtin(), &NoDependencies)
        .unwrap();
    let label = resolved
        .pointer("/extension/legend/scenes/item/labelText")
        .unwrap();
    assert!(is_function_ref(label));
    assert_eq!(label["width"], 117);
}

#[test]
fn cartesian_formatters_use_environment_locale() {
    let target = Target::new("pentaho/ccc/visual/CartesianAbstract");
    let resolved = Resolver::new()
        .resolve(&target, &builtin(), &environment("de-DE"))
        .unwrap();

    let formatter = resolved
        .pointer("/extension/timeSeriesAxisTickFormatter")
        .unwrap();
    assert!(is_function_ref(formatter));
    assert_eq!(formatter["locale"], "de-DE");
    assert_eq!(resolved.pointer("/extension/axisTicks"), Some(&json!(true)));
}

#[test]
fn cartesian_without_environment_aborts_or_skips() {
    let target = Target::new("pentaho/ccc/visual/CartesianAbstract");
    let rules = builtin();

    assert!(Resolver::new().resolve(&target, &rules, &NoDependencies).is_err());

    let resolved = Resolver::new()
        .with_policy(FailurePolicy::Skip)
        .resolve(&target, &rules, &NoDependencies)
        .unwrap();
    assert_eq!(resolved.skipped.len(), 1);
    assert_eq!(resolved.pointer("/extension/timeSeriesAxisTickFormatter"), None);
    assert_eq!(resolved.pointer("/extension/axisTicks"), Some(&json!(true)));
}

#[test]
fn empty_environment_falls_back_to_default_locale() {
    let deps = MapDependencies::new().with("environment", json!({}));
    let resolved = Resolver::new()
        .resolve(
            &Target::new("pentaho/ccc/visual/CartesianAbstract"),
            &builtin(),
            &deps,
        )
        .unwrap();
    assert_eq!(
        resolved.pointer("/extension/timeSeriesAxisTickFormatter/locale"),
        Some(&json!(DEFAULT_LOCALE))
    );
}

#[test]
fn key_validation_applies_only_to_keyed_applications() {
    let rules = builtin();
    let module = "pentaho/visual/role/AbstractProperty";

    for app in ["pentaho/analyzer", "pentaho/dashboardDesigner"] {
        let resolved = Resolver::new()
            .resolve(&Target::new(module).with_application(app), &rules, &NoDependencies)
            .unwrap();
        assert!(is_function_ref(resolved.pointer("/validateOn").unwrap()));
    }

    let resolved = Resolver::new()
        .resolve(&Target::new(module).with_application("pentaho/cdf"), &rules, &NoDependencies)
        .unwrap();
    assert!(resolved.is_empty());
}

#[test]
fn registry_serves_builtin_rules_across_threads() {
    let registry = Arc::new(RuleRegistry::new(builtin()));
    let deps = Arc::new(environment("ja-JP"));

    let handles: Vec<_> = ["pentaho/det", "pentaho/cdf", "pentaho/analyzer", "pentaho/det"]
        .into_iter()
        .map(|app| {
            let registry = Arc::clone(&registry);
            let deps = Arc::clone(&deps);
            std::thread::spawn(move || {
                let target = Target::new("pentaho/ccc/visual/CartesianAbstract").with_application(app);
                registry
                    .resolve(&target, deps.as_ref())
                    .unwrap()
                    .pointer("/extension/timeSeriesAxisTickFormatter/locale")
                    .cloned()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(json!("ja-JP")));
    }
    assert_eq!(registry.cached(), 3);
}

/// Resolve one view module for no particular application.
fn view(module: &str) -> viz_style_rules::ResolvedConfig {
    Resolver::new()
        .resolve(&Target::new(module), &builtin(), &environment("en-US"))
        .unwrap()
}

#[test]
fn every_view_rule_contributes_its_defaults() {
    let cases = [
        ("pentaho/ccc/visual/Bar", "/extension/xAxisSizeMax", json!(90)),
        ("pentaho/ccc/visual/Boxplot", "/extension/yAxisSize", json!(57)),
        ("pentaho/ccc/visual/MetricPointAbstract", "/extension/autoPaddingByDotSize", json!(true)),
        ("pentaho/ccc/visual/Bubble", "/extension/sizeAxisRatioTo", json!("minwidthheight")),
        ("pentaho/ccc/visual/BarHorizontal", "/extension/xAxisPosition", json!("top")),
        ("pentaho/ccc/visual/BarAbstract", "/extension/barSizeMax", json!(150)),
        ("pentaho/ccc/visual/PointAbstract", "/extension/linesVisible", json!(false)),
        ("pentaho/ccc/visual/PointAbstract", "/extension/tooltipOffset", json!(15)),
        ("pentaho/ccc/visual/PointAbstract", "/extension/xAxisGrid", json!(true)),
        ("pentaho/ccc/visual/BarLine", "/extension/pointLine_imask", json!("ShowsActivity")),
        ("pentaho/ccc/visual/AreaAbstract", "/extension/linesVisible", json!(false)),
        ("pentaho/ccc/visual/Pie", "/extension/valuesAnchor", json!("outer")),
        ("pentaho/ccc/visual/Pie", "/extension/slice_lineWidth", json!(0)),
        ("pentaho/ccc/visual/Pie", "/extension/titlePosition", json!("bottom")),
        ("pentaho/ccc/visual/Pie", "/extension/contentMargins", json!({"top": 30})),
        ("pentaho/ccc/visual/Donut", "/extension/slice_innerRadiusEx", json!("60%")),
        ("pentaho/ccc/visual/HeatGrid", "/extension/useShapes", json!(true)),
        ("pentaho/ccc/visual/HeatGrid", "/extension/colorScaleType", json!("linear")),
        ("pentaho/ccc/visual/HeatGrid", "/extension/xAxisSizeMax", json!(80)),
        ("pentaho/ccc/visual/HeatGrid", "/extension/contentPaddings", json!({"right": 98})),
        ("pentaho/ccc/visual/Sunburst", "/extension/colorMode", json!("level")),
        ("pentaho/ccc/visual/Sunburst", "/extension/legendAreaVisible", json!(false)),
        ("pentaho/ccc/visual/Waterfall", "/extension/legendAreaVisible", json!(true)),
        ("pentaho/ccc/visual/Waterfall", "/extension/axisGrid", json!(true)),
        ("pentaho/ccc/visual/Treemap", "/extension/valuesVisible", json!(true)),
    ];

    for (module, pointer, expected) in cases {
        assert_eq!(
            view(module).pointer(pointer),
            Some(&expected),
            "{} {}",
            module,
            pointer
        );
    }
}

#[test]
fn view_style_functions_stay_references() {
    let cases = [
        ("pentaho/ccc/visual/PointAbstract", "/extension/xAxisGrid_left", "discreteGridHalfStepLeft"),
        ("pentaho/ccc/visual/PointAbstract", "/extension/pointDot_fillStyle", "pointDotInteractionFill"),
        ("pentaho/ccc/visual/Area", "/extension/area_fillStyle", "fillStyle2"),
        ("pentaho/ccc/visual/AreaStacked", "/extension/area_fillStyle", "fillStyle3"),
        ("pentaho/ccc/visual/Pie", "/extension/slice_fillStyle", "fillStyle1"),
        ("pentaho/ccc/visual/HeatGrid", "/extension/dot_lineWidth", "heatGridNullShapeLineWidth"),
        ("pentaho/ccc/visual/Sunburst", "/extension/slice_strokeStyle", "constant"),
    ];

    for (module, pointer, name) in cases {
        let resolved = view(module);
        let value = resolved.pointer(pointer).unwrap();
        assert!(is_function_ref(value), "{} {}", module, pointer);
        assert_eq!(value["$fn"], name, "{} {}", module, pointer);
    }
}

#[test]
fn point_dots_cover_bar_line_second_plot() {
    let resolved = view("pentaho/ccc/visual/BarLine");
    assert_eq!(
        resolved.pointer("/extension/pointDot_lineWidth"),
        Some(&json!({"$fn": "constant", "value": 2}))
    );
    assert_eq!(resolved.pointer("/extension/linesVisible"), None);
}

#[test]
fn application_rules_override_view_defaults() {
    let target = Target::new("pentaho/ccc/visual/PointAbstract").with_application("pentaho/det");
    let resolved = Resolver::new()
        .resolve(&target, &builtin(), &NoDependencies)
        .unwrap();
    assert_eq!(resolved.pointer("/extension/dotsVisible"), Some(&json!(false)));
    assert_eq!(resolved.pointer("/extension/linesVisible"), Some(&json!(false)));
}
