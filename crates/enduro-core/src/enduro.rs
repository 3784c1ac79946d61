//! An enduro: a titled route sheet.

use crate::config::EngineConfig;
use crate::route_sheet::RouteSheet;

/// A route sheet plus its (possibly multi-line) title.
#[derive(Debug, Default)]
pub struct Enduro {
    title: String,
    route_sheet: RouteSheet,
}

impl Enduro {
    pub fn new(route_sheet: RouteSheet) -> Self {
        Self {
            title: String::new(),
            route_sheet,
        }
    }

    pub fn with_title(title: impl Into<String>, route_sheet: RouteSheet) -> Self {
        Self {
            title: title.into(),
            route_sheet,
        }
    }

    /// An untitled enduro with an empty route sheet built from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.route_sheet())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Title lines, in order.
    pub fn title_lines(&self) -> impl Iterator<Item = &str> {
        self.title.split('\n')
    }

    pub fn route_sheet(&self) -> &RouteSheet {
        &self.route_sheet
    }

    pub fn route_sheet_mut(&mut self) -> &mut RouteSheet {
        &mut self.route_sheet
    }

    pub fn into_route_sheet(self) -> RouteSheet {
        self.route_sheet
    }
}
