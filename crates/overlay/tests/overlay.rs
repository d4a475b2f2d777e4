use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_PI_3;
use std::rc::Rc;

use overlay::*;
use schemaviz_layout::{Position, Size};
use tracing_test::traced_test;

struct MockHost {
    children: Vec<u32>,
    styles: HashMap<u32, ElementStyle>,
    style_calls: Vec<(u32, ElementStyle)>,
    positions: HashMap<u32, (f64, f64)>,
    sizes: HashMap<u32, Size>,
    static_positioned: HashSet<u32>,
    measured: RefCell<HashMap<u32, usize>>,
    offset: Position,
    camera: Camera,
    clipping: Vec<Plane>,
    unsubscribed: bool,
}

impl MockHost {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            styles: HashMap::new(),
            style_calls: Vec::new(),
            positions: HashMap::new(),
            sizes: HashMap::new(),
            static_positioned: HashSet::new(),
            measured: RefCell::new(HashMap::new()),
            offset: Position::default(),
            camera: camera(),
            clipping: Vec::new(),
            unsubscribed: false,
        }
    }

    fn style_calls_for(&self, element: u32) -> Vec<ElementStyle> {
        self.style_calls
            .iter()
            .filter(|(e, _)| *e == element)
            .map(|(_, s)| *s)
            .collect()
    }
}

impl OverlayHost for MockHost {
    type Element = u32;

    fn contains(&self, element: &u32) -> bool {
        self.children.contains(element)
    }

    fn append(&mut self, element: &u32) {
        if !self.children.contains(element) {
            self.children.push(*element);
        }
    }

    fn remove_child(&mut self, element: &u32) {
        self.children.retain(|e| e != element);
    }

    fn is_absolutely_positioned(&self, element: &u32) -> bool {
        !self.static_positioned.contains(element)
    }

    fn measure(&self, element: &u32) -> Size {
        *self.measured.borrow_mut().entry(*element).or_default() += 1;
        self.sizes
            .get(element)
            .copied()
            .unwrap_or(Size::new(64.0, 18.0))
    }

    fn visibility(&self, element: &u32) -> Option<Visibility> {
        self.styles.get(element).map(|s| s.visibility)
    }

    fn set_style(&mut self, element: &u32, style: ElementStyle) {
        self.styles.insert(*element, style);
        self.style_calls.push((*element, style));
    }

    fn set_position(&mut self, element: &u32, left: f64, top: f64) {
        self.positions.insert(*element, (left, top));
    }

    fn canvas_size(&self) -> Size {
        Size::new(800.0, 600.0)
    }

    fn canvas_offset(&self) -> Position {
        self.offset
    }

    fn camera(&self) -> Camera {
        self.camera.clone()
    }

    fn clipping_planes(&self) -> Vec<Plane> {
        self.clipping.clone()
    }

    fn unsubscribe(&mut self) {
        self.unsubscribed = true;
    }
}

fn camera() -> Camera {
    Camera::look_at(
        Point3::new(0.0, 0.0, 10.0),
        Point3::origin(),
        Vector3::y(),
        FRAC_PI_3,
        4.0 / 3.0,
        0.1,
        100.0,
    )
}

fn plain_tool() -> HtmlOverlayTool<MockHost, &'static str> {
    HtmlOverlayTool::new(MockHost::new(), OverlayToolOptions::default())
}

fn clustering_tool(
    clusters: Rc<RefCell<Vec<Vec<(u32, Option<&'static str>)>>>>,
) -> HtmlOverlayTool<MockHost, &'static str> {
    let mut next = 100;
    let options = OverlayToolOptions {
        clustering: Some(ClusteringOptions::overlap_in_screen_space(
            move |members: &[ClusterMember<'_, u32, &'static str>]| {
                clusters.borrow_mut().push(
                    members
                        .iter()
                        .map(|m| (*m.element, m.user_data.copied()))
                        .collect(),
                );
                next += 1;
                next
            },
        )),
    };
    HtmlOverlayTool::new(MockHost::new(), options)
}

#[test]
fn test_identical_boxes_collapse_into_one_composite() {
    let clusters = Rc::new(RefCell::new(Vec::new()));
    let mut tool = clustering_tool(clusters.clone());
    tool.add(1, Point3::origin(), OverlayOptions::default().with_user_data("a"))
        .unwrap();
    tool.add(2, Point3::origin(), OverlayOptions::default().with_user_data("b"))
        .unwrap();

    tool.on_scene_rendered(&camera()).unwrap();

    assert_eq!(tool.is_element_visible(&1), Some(false));
    assert_eq!(tool.is_element_visible(&2), Some(false));
    assert_eq!(tool.composites().len(), 1);
    assert_eq!(
        clusters.borrow().as_slice(),
        &[vec![(1, Some("a")), (2, Some("b"))]]
    );

    let composite = tool.composites()[0];
    let host = tool.host();
    assert!(host.contains(&composite));
    assert_eq!(host.visibility(&composite), Some(Visibility::Visible));
    let (left, top) = host.positions[&composite];
    assert!((left - 400.0).abs() < 1e-9);
    assert!((top - 300.0).abs() < 1e-9);
    assert_eq!(host.visibility(&1), Some(Visibility::Hidden));
    assert_eq!(host.visibility(&2), Some(Visibility::Hidden));
}

#[test]
fn test_composites_are_rebuilt_each_update() {
    let clusters = Rc::new(RefCell::new(Vec::new()));
    let mut tool = clustering_tool(clusters.clone());
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.add(2, Point3::origin(), OverlayOptions::default())
        .unwrap();

    tool.on_scene_rendered(&camera()).unwrap();
    let first = tool.composites()[0];
    tool.on_scene_rendered(&camera()).unwrap();

    assert_eq!(tool.composites().len(), 1);
    assert_ne!(tool.composites()[0], first);
    assert!(!tool.host().contains(&first));
    assert_eq!(tool.host().children.len(), 3);
    assert_eq!(clusters.borrow().len(), 2);
}

#[test]
fn test_distant_elements_are_not_clustered() {
    let clusters = Rc::new(RefCell::new(Vec::new()));
    let mut tool = clustering_tool(clusters.clone());
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.add(2, Point3::new(3.0, 0.0, 0.0), OverlayOptions::default())
        .unwrap();

    tool.on_scene_rendered(&camera()).unwrap();

    assert!(tool.composites().is_empty());
    assert!(clusters.borrow().is_empty());
    assert_eq!(tool.is_element_visible(&1), Some(true));
    assert_eq!(tool.is_element_visible(&2), Some(true));
}

#[test]
fn test_elements_outside_depth_range_are_hidden() {
    let mut tool = plain_tool();
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.add(2, Point3::new(0.0, 0.0, 20.0), OverlayOptions::default())
        .unwrap();
    tool.add(3, Point3::new(0.0, 0.0, -200.0), OverlayOptions::default())
        .unwrap();

    tool.force_update(None).unwrap();

    assert_eq!(tool.is_element_visible(&1), Some(true));
    assert_eq!(tool.is_element_visible(&2), Some(false));
    assert_eq!(tool.is_element_visible(&3), Some(false));
    assert_eq!(tool.host().visibility(&1), Some(Visibility::Visible));
    assert_eq!(tool.host().visibility(&2), Some(Visibility::Hidden));
}

#[test]
fn test_clipping_planes_hide_elements() {
    let mut host = MockHost::new();
    host.clipping = vec![Plane::from_normal_and_coplanar_point(
        Vector3::x_axis(),
        &Point3::origin(),
    )];
    let mut tool: HtmlOverlayTool<MockHost> = HtmlOverlayTool::new(host, OverlayToolOptions::default());
    tool.add(1, Point3::new(1.0, 0.0, 0.0), OverlayOptions::default())
        .unwrap();
    tool.add(2, Point3::new(-1.0, 0.0, 0.0), OverlayOptions::default())
        .unwrap();

    tool.force_update(None).unwrap();

    assert_eq!(tool.is_element_visible(&1), Some(true));
    assert_eq!(tool.is_element_visible(&2), Some(false));
}

#[test]
fn test_positions_include_canvas_offset() {
    let mut host = MockHost::new();
    host.offset = Position::new(10.0, 20.0);
    let mut tool: HtmlOverlayTool<MockHost> = HtmlOverlayTool::new(host, OverlayToolOptions::default());
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();

    tool.force_update(None).unwrap();

    let (left, top) = tool.host().positions[&1];
    assert!((left - 410.0).abs() < 1e-9);
    assert!((top - 320.0).abs() < 1e-9);
    let screen = tool.screen_position(&1).unwrap();
    assert!((screen.x - 400.0).abs() < 1e-9);
}

#[test]
fn test_add_rejects_attached_and_static_elements() {
    let mut host = MockHost::new();
    host.static_positioned.insert(7);
    let mut tool: HtmlOverlayTool<MockHost> = HtmlOverlayTool::new(host, OverlayToolOptions::default());

    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    assert!(matches!(
        tool.add(1, Point3::origin(), OverlayOptions::default()),
        Err(OverlayError::AlreadyAttached)
    ));
    assert!(matches!(
        tool.add(7, Point3::origin(), OverlayOptions::default()),
        Err(OverlayError::NotAbsolutelyPositioned)
    ));
    assert!(!tool.host().contains(&7));
    assert_eq!(tool.elements().len(), 1);
}

#[test]
fn test_remove_unknown_element_fails() {
    let mut tool = plain_tool();
    assert!(matches!(tool.remove(&5), Err(OverlayError::NotAttached)));

    tool.add(5, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.remove(&5).unwrap();
    assert!(!tool.host().contains(&5));
    assert!(tool.elements().is_empty());
}

#[test]
fn test_elements_are_measured_once() {
    let mut tool = plain_tool();
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.force_update(None).unwrap();
    tool.force_update(None).unwrap();
    tool.on_scene_rendered(&camera()).unwrap();

    assert_eq!(tool.host().measured.borrow()[&1], 1);
}

#[test]
fn test_fades_only_on_visibility_change() {
    let mut tool = plain_tool();
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.force_update(None).unwrap();
    tool.force_update(None).unwrap();

    assert_eq!(
        tool.host().style_calls_for(1),
        vec![ElementStyle::HIDDEN, ElementStyle::FADE_IN]
    );

    tool.host_mut().camera = Camera::look_at(
        Point3::new(0.0, 0.0, -10.0),
        Point3::new(0.0, 0.0, -20.0),
        Vector3::y(),
        FRAC_PI_3,
        4.0 / 3.0,
        0.1,
        100.0,
    );
    tool.force_update(None).unwrap();
    assert_eq!(
        tool.host().style_calls_for(1).last(),
        Some(&ElementStyle::FADE_OUT)
    );
}

#[test]
fn test_position_callback_reports_distance_and_user_data() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = seen.clone();
    let mut tool = plain_tool();
    tool.add(
        1,
        Point3::origin(),
        OverlayOptions::default()
            .with_user_data("label")
            .on_position_updated(move |element, screen, anchor, distance, data| {
                record
                    .borrow_mut()
                    .push((*element, screen, anchor, distance, data.copied()));
            }),
    )
    .unwrap();

    tool.force_update(None).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let (element, screen, anchor, distance, data) = seen[0];
    assert_eq!(element, 1);
    assert!((screen.x - 400.0).abs() < 1e-9 && (screen.y - 300.0).abs() < 1e-9);
    assert_eq!(anchor, Point3::origin());
    assert!((distance - 10.0).abs() < 1e-9);
    assert_eq!(data, Some("label"));
}

#[test]
fn test_hidden_tool_skips_updates() {
    let mut tool = plain_tool();
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.visible(false).unwrap();

    tool.on_scene_rendered(&camera()).unwrap();

    assert_eq!(tool.host().visibility(&1), Some(Visibility::Hidden));
    assert!(!tool.host().positions.contains_key(&1));

    tool.visible(true).unwrap();
    assert!(tool.host().positions.contains_key(&1));
}

#[test]
fn test_scheduled_update_runs_once() {
    let mut tool = plain_tool();
    assert!(!tool.run_scheduled_update().unwrap());
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    assert!(tool.run_scheduled_update().unwrap());
    assert!(!tool.run_scheduled_update().unwrap());
}

#[test]
fn test_clear_removes_everything() {
    let clusters = Rc::new(RefCell::new(Vec::new()));
    let mut tool = clustering_tool(clusters);
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.add(2, Point3::origin(), OverlayOptions::default())
        .unwrap();
    tool.force_update(None).unwrap();

    tool.clear().unwrap();

    assert!(tool.elements().is_empty());
    assert!(tool.composites().is_empty());
    assert!(tool.host().children.is_empty());
}

#[test]
#[traced_test]
fn test_dispose_unsubscribes_and_rejects_further_use() {
    let mut tool = plain_tool();
    assert!(logs_contain("overlay tool created"));
    tool.add(1, Point3::origin(), OverlayOptions::default())
        .unwrap();

    tool.on_viewer_disposed().unwrap();

    assert!(tool.is_disposed());
    assert!(tool.host().unsubscribed);
    assert!(tool.host().children.is_empty());
    assert!(matches!(
        tool.add(2, Point3::origin(), OverlayOptions::default()),
        Err(OverlayError::Disposed)
    ));
    assert!(matches!(tool.dispose(), Err(OverlayError::Disposed)));
}
