use hotwirekit_camtools::{
    traverse, ElementKind, GcodeEmitter, KerfModel, MachineEnvelope, NodeId, PathAnchor,
    PathGraph, SegmentRef, ShapePathGenerator, ShapePathParameters, TraversalOptions,
};
use hotwirekit_core::{Point3, Profile2D, Section, Solid};
use hotwirekit_settings::{FeedMode, FoamProfile, MachineSettings, TableProfile};

fn add_prism(graph: &mut PathGraph, name: &str, section: &Section, foam: &FoamProfile) -> NodeId {
    let solid = Solid::prism(name, section, 50.0, 450.0).unwrap();
    let params = ShapePathParameters::default();
    let paths = ShapePathGenerator::new(params, KerfModel::from_foam(foam))
        .generate(&solid)
        .unwrap();
    graph.add_shape(name, paths, params).unwrap()
}

fn anchor_at(graph: &PathGraph, node: NodeId, index: usize) -> PathAnchor {
    let point = graph.node(node).unwrap().rails.side_a()[index];
    graph.anchor(node, &point).unwrap()
}

fn setup() -> (PathGraph, FoamProfile, TableProfile, MachineSettings) {
    let settings = MachineSettings::default();
    let table = TableProfile::default();
    let graph = PathGraph::new(settings.virtual_zero_point(), table.wire_length);
    (graph, FoamProfile::default(), table, settings)
}

#[test]
fn test_rectangular_prism_end_to_end() {
    let (mut graph, foam, table, settings) = setup();
    let section = Section::new(Profile2D::rectangle(50.0, 50.0, 100.0, 50.0));
    let block = add_prism(&mut graph, "block", &section, &foam);

    let rails = &graph.node(block).unwrap().rails;
    assert_eq!(rails.side_a().len(), rails.side_b().len());
    assert!(rails.is_closed());

    let entry = anchor_at(&graph, block, 0);
    graph.set_initial_path(entry, vec![]).unwrap();
    graph.set_final_path(entry, vec![]).unwrap();

    let route = traverse(&graph, TraversalOptions::default()).unwrap();
    let envelope = MachineEnvelope::from_profiles(&table, &settings);
    let report = GcodeEmitter::new(envelope, &foam, &settings)
        .generate(&route)
        .unwrap();

    let lines: Vec<&str> = report.gcode.lines().collect();
    assert_eq!(&lines[..4], ["G21", "G17", "G90", "G93"]);
    let first_heater = lines.iter().find(|l| l.starts_with("M3")).unwrap();
    assert_eq!(*first_heater, "M3 S750");
    assert_eq!(&lines[lines.len() - 2..], ["M5", "G94"]);
    assert!(lines
        .iter()
        .filter(|l| l.starts_with("G1 "))
        .all(|l| l.contains(" F")));
    assert_eq!(report.move_count, route.len());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_constant_feed_end_to_end() {
    let (mut graph, foam, table, _) = setup();
    let settings = MachineSettings {
        feed_mode: FeedMode::Constant,
        ..Default::default()
    };
    let section = Section::new(Profile2D::rectangle(50.0, 50.0, 100.0, 50.0));
    let block = add_prism(&mut graph, "block", &section, &foam);
    let entry = anchor_at(&graph, block, 0);
    graph.set_initial_path(entry, vec![]).unwrap();
    graph.set_final_path(entry, vec![]).unwrap();

    let route = traverse(&graph, TraversalOptions::default()).unwrap();
    let envelope = MachineEnvelope::from_profiles(&table, &settings);
    let report = GcodeEmitter::new(envelope, &foam, &settings)
        .generate(&route)
        .unwrap();

    assert!(report.gcode.starts_with("G21\nG17\nG90\nG94\nM3 S750\nG1 F240.000\n"));
    // initial path, shape, final path
    assert_eq!(report.gcode.matches("M3 S750").count(), 3);
    assert!(report
        .gcode
        .lines()
        .filter(|l| l.starts_with("G1 X"))
        .all(|l| !l.contains('F')));
}

#[test]
fn test_hole_is_cut_through_its_link() {
    let (mut graph, foam, table, settings) = setup();
    let section = Section::new(Profile2D::rectangle(50.0, 50.0, 100.0, 100.0))
        .with_hole(Profile2D::rectangle(80.0, 80.0, 40.0, 40.0));
    let frame = add_prism(&mut graph, "frame", &section, &foam);
    let hole = graph.find_node("frame_1").unwrap();
    assert_eq!(graph.kind_of(SegmentRef::Node(hole)), Some(ElementKind::InnerShape));

    let entry = anchor_at(&graph, frame, 0);
    graph.set_initial_path(entry, vec![]).unwrap();
    let link = graph
        .add_link(entry, anchor_at(&graph, hole, 0), vec![])
        .unwrap();
    graph.set_final_path(entry, vec![]).unwrap();

    let route = traverse(&graph, TraversalOptions::default()).unwrap();
    let hole_points = route
        .commands
        .iter()
        .filter(|c| c.segment == SegmentRef::Node(hole))
        .count();
    assert_eq!(hole_points, 4);
    let link_moves = route
        .commands
        .iter()
        .filter(|c| c.segment == SegmentRef::Link(link))
        .count();
    // in and back out
    assert_eq!(link_moves, 2);

    let envelope = MachineEnvelope::from_profiles(&table, &settings);
    let report = GcodeEmitter::new(envelope, &foam, &settings)
        .generate(&route)
        .unwrap();
    assert!(report.gcode.ends_with("M5\nG94\n"));
}

#[test]
fn test_chained_shapes_visit_every_segment() {
    let (mut graph, foam, table, settings) = setup();
    let a = add_prism(
        &mut graph,
        "a",
        &Section::new(Profile2D::rectangle(20.0, 20.0, 60.0, 60.0)),
        &foam,
    );
    let b = add_prism(
        &mut graph,
        "b",
        &Section::new(Profile2D::rectangle(150.0, 20.0, 60.0, 60.0)),
        &foam,
    );
    graph.set_initial_path(anchor_at(&graph, a, 0), vec![]).unwrap();
    let link = graph
        .add_link(anchor_at(&graph, a, 0), anchor_at(&graph, b, 0), vec![])
        .unwrap();
    graph.set_final_path(anchor_at(&graph, b, 0), vec![]).unwrap();

    let route = traverse(&graph, TraversalOptions::default()).unwrap();
    assert_eq!(route.commands.first().unwrap().kind, ElementKind::InitialPath);
    assert_eq!(route.commands.last().unwrap().kind, ElementKind::FinalPath);
    for segment in [SegmentRef::Node(a), SegmentRef::Node(b), SegmentRef::Link(link)] {
        assert!(route.commands.iter().any(|c| c.segment == segment));
    }
    assert_eq!(route.side_a.last(), Some(&Point3::origin()));

    let envelope = MachineEnvelope::from_profiles(&table, &settings);
    let report = GcodeEmitter::new(envelope, &foam, &settings)
        .generate(&route)
        .unwrap();
    // one heater command per segment: initial, a, link, b, final
    assert_eq!(report.gcode.matches("M3 S750").count(), 5);
}

#[test]
fn test_missing_final_path_aborts() {
    let (mut graph, foam, _, _) = setup();
    let section = Section::new(Profile2D::rectangle(50.0, 50.0, 100.0, 50.0));
    let block = add_prism(&mut graph, "block", &section, &foam);
    graph
        .set_initial_path(anchor_at(&graph, block, 0), vec![])
        .unwrap();
    let err = traverse(&graph, TraversalOptions::default()).unwrap_err();
    assert!(err.to_string().contains("no final path"));
}

#[test]
fn test_link_to_unknown_point_is_rejected() {
    let (mut graph, foam, _, _) = setup();
    let section = Section::new(Profile2D::rectangle(50.0, 50.0, 100.0, 50.0));
    let block = add_prism(&mut graph, "block", &section, &foam);
    let err = graph
        .anchor(block, &Point3::new(1.0, 2.0, 3.0))
        .unwrap_err();
    assert!(err.to_string().contains("link control point not found"));
}
