use graphview::{Frame, Viewport};

use crate::schema::{HEADER_HEIGHT, ROW_HEIGHT, SchemaModel};

/// SVG of the visible part of `frame`. Field rows are drawn only at full detail.
pub fn generate_svg(frame: &Frame, viewport: Viewport, model: &SchemaModel) -> String {
    let mut svg = format!(
        r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">
<rect width="100%" height="100%" fill="white"/>
<g transform="scale({})">
"#,
        viewport.width, viewport.height, frame.wrapper_scale
    );

    for link in frame.links.iter().filter(|l| l.visible) {
        svg.push_str(&format!(
            r##"  <path id="{}" d="{}" fill="none" stroke="#8a94a6" stroke-width="1.5"/>
"##,
            escape(&link.id),
            link.path.to_svg_d()
        ));
    }

    for node in frame.nodes.iter().filter(|n| n.visible) {
        svg.push_str(&format!(
            r##"  <g class="node" id="{}">
    <rect x="{}" y="{}" width="{}" height="{}" rx="4" fill="#f5f7fa" stroke="#445566"/>
    <text x="{}" y="{}" font-family="monospace" font-size="13" font-weight="bold">{}</text>
"##,
            escape(&node.id),
            node.x,
            node.y,
            node.size.width,
            node.size.height,
            node.x + 8.0,
            node.y + 19.0,
            escape(&node.id)
        ));
        if frame.full_detail {
            let fields = model.get(&node.id).map(|t| t.fields.as_slice()).unwrap_or_default();
            for (row, field) in fields.iter().enumerate() {
                svg.push_str(&format!(
                    r#"    <text x="{}" y="{}" font-family="monospace" font-size="11">{}: {}</text>
"#,
                    node.x + 8.0,
                    node.y + HEADER_HEIGHT + row as f64 * ROW_HEIGHT + 14.0,
                    escape(&field.name),
                    escape(&field.ty)
                ));
            }
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("</g>\n</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use graphview::{LinkFrame, LinkPath, NodeFrame, Position, Size, Transform};

    use super::*;
    use crate::schema::parse_schema;

    fn frame(full_detail: bool, visible: bool) -> Frame {
        Frame {
            transform: Transform::IDENTITY,
            node_scale: 1.0,
            wrapper_scale: 1.0,
            full_detail,
            container: Default::default(),
            nodes: vec![NodeFrame {
                id: "Post".into(),
                x: 10.0,
                y: 20.0,
                size: Size::new(120.0, 48.0),
                visible,
            }],
            links: vec![LinkFrame {
                id: "Post.author".into(),
                source: "Post".into(),
                target: "User".into(),
                path: LinkPath::Line {
                    source: Position::new(0.0, 0.0),
                    target: Position::new(5.0, 5.0),
                },
                visible,
            }],
        }
    }

    fn model() -> SchemaModel {
        parse_schema("type Post { field title type=\"String!\" }").unwrap()
    }

    #[test]
    fn test_visible_geometry_is_drawn() {
        let svg = generate_svg(&frame(true, true), Viewport::new(800.0, 600.0), &model());
        assert!(svg.starts_with(r#"<svg width="800" height="600""#));
        assert!(svg.contains(r#"<rect x="10" y="20" width="120" height="48""#));
        assert!(svg.contains(r#"id="Post.author""#));
        assert!(svg.contains("title: String!"));
    }

    #[test]
    fn test_fields_need_full_detail() {
        let svg = generate_svg(&frame(false, true), Viewport::new(800.0, 600.0), &model());
        assert!(svg.contains(">Post<"));
        assert!(!svg.contains("title:"));
    }

    #[test]
    fn test_hidden_geometry_is_skipped() {
        let svg = generate_svg(&frame(true, false), Viewport::new(800.0, 600.0), &model());
        assert!(!svg.contains("Post"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
