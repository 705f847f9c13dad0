//! Assembles the projection document for a note

const CONTAINER_STYLE: &str = "position:relative;width:100%;height:100%;display:flex;align-items:center;justify-content:center;";

const MEDIA_STYLE: &str = "position:relative;width:100%;height:100%;display:flex;align-items:center;justify-content:center;";

/// The info box is a sibling of the media wrapper so zoom and rotation
/// applied to the media never move it
const INFO_BOX_STYLE: &str = "position:absolute;top:16px;right:16px;max-width:350px;max-height:60%;overflow-y:auto;\
background:rgba(0,0,0,0.9);border:2px solid rgba(255,255,255,0.3);border-radius:8px;padding:16px 20px;\
color:#fff;font-size:14px;line-height:1.6;box-shadow:0 4px 24px rgba(0,0,0,0.7);z-index:9999;text-align:left;";

pub const CONTAINER_CLASS: &str = "vtt-note-container";
pub const MEDIA_CLASS: &str = "vtt-note-image";
pub const INFO_BOX_CLASS: &str = "vtt-player-info-box";

/// Center `image_html` and, when there is any, pin `player_info_html` to the
/// top-right corner above it
pub fn compose_projection(image_html: &str, player_info_html: &str) -> String {
    let mut html = String::with_capacity(image_html.len() + player_info_html.len() + 1024);
    html.push_str(&format!(r#"<div class="{CONTAINER_CLASS}" style="{CONTAINER_STYLE}">"#));
    html.push_str(&format!(r#"<div class="{MEDIA_CLASS}" style="{MEDIA_STYLE}">{image_html}</div>"#));

    if !player_info_html.trim().is_empty() {
        html.push_str(&format!(
            r#"<div class="{INFO_BOX_CLASS}" style="{INFO_BOX_STYLE}">{player_info_html}</div>"#
        ));
    }

    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_only() {
        let html = compose_projection(r#"<img src="a.png">"#, "  \n ");
        assert!(html.starts_with(r#"<div class="vtt-note-container""#));
        assert!(html.contains(r#"<img src="a.png"></div>"#));
        assert!(!html.contains(INFO_BOX_CLASS));
        assert!(html.ends_with("</div></div>"));
    }

    #[test]
    fn test_info_box_is_sibling_of_media() {
        let html = compose_projection(r#"<img src="a.png">"#, "<p>Muddy</p>");
        let media_end = html.find(r#"<img src="a.png"></div>"#).unwrap();
        let box_start = html.find(INFO_BOX_CLASS).unwrap();
        assert!(box_start > media_end);
        assert!(html.contains("<p>Muddy</p></div></div>"));
    }

    #[test]
    fn test_info_box_layout_contract() {
        let html = compose_projection("", "<p>x</p>");
        for rule in ["position:absolute", "top:16px", "right:16px", "max-width:350px", "max-height:60%", "overflow-y:auto", "z-index:9999"] {
            assert!(html.contains(rule), "missing {rule}");
        }
        assert!(html.contains("align-items:center;justify-content:center"));
    }
}
