use layers::CQL_FILTER_PARAM;
use serde_json::json;
use viewstate::ToolDescriptor;

/// Tools every viewer starts with. They live only on the running viewer and
/// are stripped from anything persisted or shared.
pub fn viewer_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("gxp_navigation")
            .with("checked", false)
            .with("toggleGroup", "navigation"),
        ToolDescriptor::new("gxp_wmsgetfeatureinfo")
            .with("checked", true)
            .with("layerParams", json!([CQL_FILTER_PARAM]))
            .with("format", "html")
            .with("defaultAction", 0)
            .with("toggleGroup", "toolGroup"),
        ToolDescriptor::new("gxp_measure")
            .with("checked", false)
            .with("controlOptions", json!({"immediate": true}))
            .with("toggleGroup", "toolGroup"),
        ToolDescriptor::new("gxp_zoom")
            .with("checked", false)
            .with("numberOfButtons", 2),
        ToolDescriptor::new("gxp_zoomtoextent").with("checked", false),
        ToolDescriptor::new("app_legendcontrol").with("checked", true),
        ToolDescriptor::new("app_zoomcontrol")
            .with("hidden", true)
            .with("actionTarget", "map")
            .with("checked", true),
    ]
}

#[cfg(test)]
mod tests {
    use super::viewer_tools;

    #[test]
    fn feature_info_forwards_layer_filters() {
        let tools = viewer_tools();
        assert_eq!(tools.len(), 7);
        let info = tools
            .iter()
            .find(|t| t.ptype == "gxp_wmsgetfeatureinfo")
            .expect("feature info tool");
        assert_eq!(info.options["layerParams"][0], "CQL_FILTER");
    }
}
