use storemap::compute::cluster::{IndexPoint, SpatialIndex};
use storemap::render::{InMemorySurface, MarkerKind, RenderOutcome, Viewport};
use storemap::{
    BoundingBox, ClusterOptions, ClusterSetManager, Config, ExplorerSession, StoreRecord,
    ViewportRenderer, parse_stores,
};

fn stacked(n: usize) -> Vec<StoreRecord> {
    (0..n)
        .map(|i| StoreRecord::new(format!("same{}", i), 35.6812, 139.7671))
        .collect()
}

#[test]
fn test_header_only_and_blank_input() {
    assert!(parse_stores("").is_empty());
    assert!(parse_stores("\n\n").is_empty());
    assert!(parse_stores("id,google_lat,google_lon,name,category,address\n").is_empty());
}

#[test]
fn test_crlf_and_reordered_columns() {
    let text = "\r\n google_lon ,name,id,google_lat,address,category\r\n\
                139.70,Shibuya,x1,35.66,Tokyo,conv\r\n\
                \r\n\
                139.76,Ginza,x2,35.67,Tokyo,conv\r\n";
    let records = parse_stores(text);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "x1");
    assert_eq!(records[0].lon, 139.70);
    assert_eq!(records[1].address, "Tokyo");
}

#[test]
fn test_non_finite_coordinates_are_dropped() {
    let text = "id,google_lat,google_lon,name,category,address\n\
                a,NaN,139.7,n,c,x\n\
                b,35.6,inf,n,c,x\n\
                c,35.6,139.7,n,c,x\n";
    let records = parse_stores(text);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "c");
}

#[test]
fn test_unparsable_numbers_default_to_zero() {
    let text = "id,google_lat,google_lon,name,category,address,rating,T_TL,M_00_04\n\
                a,35.6,139.7,n,c,x,great,many,\n";
    let records = parse_stores(text);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rating, 0.0);
    assert_eq!(records[0].demographics.total, 0.0);
    assert_eq!(records[0].demographics.male_by_age[0], 0.0);
}

#[test]
fn test_identical_coordinates_split_only_past_max_zoom() {
    let mut clusters = ClusterSetManager::default();
    clusters.set_base(stacked(50)).unwrap();
    let index = clusters.active_index().unwrap();
    let bbox = BoundingBox::new(139.0, 35.0, 140.0, 36.0);

    for zoom in 0..=16 {
        let nodes = index.get_clusters(&bbox, zoom as f64);
        assert_eq!(nodes.len(), 1, "zoom {}", zoom);
        assert_eq!(nodes[0].point_count(), 50);
    }
    let top = index.get_clusters(&bbox, 0.0);
    let id = match &top[0] {
        storemap::Node::Cluster(summary) => summary.id,
        storemap::Node::Leaf(_) => panic!("expected a cluster"),
    };
    assert_eq!(index.get_expansion_zoom(id).unwrap(), 17);
    assert_eq!(index.get_clusters(&bbox, 17.0).len(), 50);
}

#[test]
fn test_identical_coordinates_render_as_stores_when_small() {
    let mut clusters = ClusterSetManager::default();
    clusters.set_base(stacked(8)).unwrap();

    let mut surface = InMemorySurface::new();
    let mut renderer = ViewportRenderer::default();
    renderer
        .render(
            &mut surface,
            clusters.render_source(),
            Some(&Viewport::new(BoundingBox::world(), 3.0)),
        )
        .unwrap();
    assert_eq!(surface.live_count(), 8);
    assert!(
        surface
            .markers()
            .iter()
            .all(|m| matches!(m.kind, MarkerKind::Store(_)))
    );
}

#[test]
fn test_antimeridian_viewport() {
    let records = vec![
        StoreRecord::new("fiji", -17.7, 179.5),
        StoreRecord::new("samoa", -13.8, -172.1),
        StoreRecord::new("tokyo", 35.7, 139.7),
    ];
    let mut clusters = ClusterSetManager::default();
    clusters.set_base(records).unwrap();

    let mut surface = InMemorySurface::new();
    let mut renderer = ViewportRenderer::default();
    let viewport = Viewport::new(BoundingBox::new(170.0, -30.0, -165.0, 0.0), 6.0);
    renderer
        .render(&mut surface, clusters.render_source(), Some(&viewport))
        .unwrap();

    let ids: Vec<&str> = surface
        .markers()
        .iter()
        .filter_map(|m| m.record().map(|r| r.id.as_str()))
        .collect();
    assert_eq!(ids, vec!["fiji", "samoa"]);
}

#[test]
fn test_unusable_viewports_are_not_ready() {
    let mut session = ExplorerSession::new(Config::default(), InMemorySurface::new()).unwrap();
    session.load_records(stacked(3)).unwrap();

    let nan = Viewport::new(BoundingBox::new(f64::NAN, 0.0, 10.0, 10.0), 4.0);
    assert_eq!(session.viewport_changed(nan).unwrap(), RenderOutcome::NotReady);

    let inverted = Viewport::new(BoundingBox::new(0.0, 40.0, 10.0, 10.0), 4.0);
    assert_eq!(
        session.viewport_changed(inverted).unwrap(),
        RenderOutcome::NotReady
    );

    let bad_zoom = Viewport::new(BoundingBox::world(), f64::INFINITY);
    assert_eq!(
        session.viewport_changed(bad_zoom).unwrap(),
        RenderOutcome::NotReady
    );
    assert_eq!(session.surface().live_count(), 0);
}

#[test]
fn test_out_of_range_zoom_is_clamped() {
    let points: Vec<IndexPoint<()>> = (0..20)
        .map(|i| IndexPoint::new(format!("p{}", i), 10.0 + i as f64 * 0.001, 20.0, ()))
        .collect();
    let index = SpatialIndex::build(points, ClusterOptions::default()).unwrap();
    let bbox = BoundingBox::world();

    assert_eq!(index.get_clusters(&bbox, -3.0), index.get_clusters(&bbox, 0.0));
    assert_eq!(index.get_clusters(&bbox, 40.0).len(), 20);
}

#[test]
fn test_duplicate_ids_share_one_store_marker() {
    let records = vec![
        StoreRecord::new("dup", 35.0, 139.0),
        StoreRecord::new("dup", 35.0001, 139.0001),
    ];
    let mut clusters = ClusterSetManager::default();
    clusters.set_base(records).unwrap();

    let mut surface = InMemorySurface::new();
    let mut renderer = ViewportRenderer::default();
    renderer
        .render(
            &mut surface,
            clusters.render_source(),
            Some(&Viewport::new(BoundingBox::world(), 18.0)),
        )
        .unwrap();
    assert_eq!(surface.live_count(), 1);
}

#[test]
fn test_empty_catalog_renders_nothing() {
    let mut session = ExplorerSession::new(Config::default(), InMemorySurface::new()).unwrap();
    session.load_records(Vec::new()).unwrap();
    let outcome = session
        .viewport_changed(Viewport::new(BoundingBox::world(), 5.0))
        .unwrap();
    assert!(matches!(outcome, RenderOutcome::Rendered(diff) if diff.is_empty()));
}
