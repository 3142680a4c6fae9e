//! Output-neutral table model shared by the HTML and terminal renderers

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    /// Relative width, as a share of the sum of all column widths
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub text: String,
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub classes: Vec<String>,
    /// Nesting depth, rendered as indentation of the first cell
    pub depth: usize,
}

impl Row {
    pub fn new(classes: &[&str]) -> Self {
        Self {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn cell(mut self, text: impl Into<String>) -> Self {
        self.cells.push(Cell {
            text: text.into(),
            class: None,
        });
        self
    }

    pub fn styled_cell(mut self, text: impl Into<String>, class: &str) -> Self {
        self.cells.push(Cell {
            text: text.into(),
            class: Some(class.to_string()),
        });
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub id: String,
    pub classes: Vec<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(id: &str, class: &str) -> Self {
        Self {
            id: id.to_string(),
            classes: vec![class.to_string()],
            ..Default::default()
        }
    }

    pub fn column(mut self, title: &str, width: u16) -> Self {
        self.columns.push(Column {
            title: title.to_string(),
            width,
        });
        self
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn column_titles(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.title.as_str()).collect()
    }
}
