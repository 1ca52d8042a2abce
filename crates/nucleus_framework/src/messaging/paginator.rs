use crate::host::{CommandSender, Messenger};

/// One paginated line, optionally with a description.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatorEntry {
    pub text: String,
    pub description: Option<String>,
}

impl PaginatorEntry {
    fn render(&self) -> String {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => format!("{} - {}", self.text, description),
            _ => self.text.clone(),
        }
    }
}

/// Splits chat output into fixed-size pages with a header line.
///
/// Pages are 1-based. Requests past the last page show the last page.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::messaging::ChatPaginator;
///
/// let mut pages = ChatPaginator::new("Jail Teleport Locations", 2);
/// pages.add("cell_a");
/// pages.add("cell_b");
/// pages.add("yard");
///
/// assert_eq!(pages.total_pages(), 2);
/// assert_eq!(pages.render(2), vec!["--- Jail Teleport Locations (2/2) ---", "yard"]);
/// ```
#[derive(Debug, Clone)]
pub struct ChatPaginator {
    title: String,
    page_size: usize,
    entries: Vec<PaginatorEntry>,
}

impl ChatPaginator {
    pub fn new(title: impl Into<String>, page_size: usize) -> Self {
        Self {
            title: title.into(),
            page_size: page_size.max(1),
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, text: impl Into<String>) {
        self.entries.push(PaginatorEntry {
            text: text.into(),
            description: None,
        });
    }

    /// Adds a `text - description` line.
    pub fn add_definition(&mut self, text: impl Into<String>, description: impl Into<String>) {
        self.entries.push(PaginatorEntry {
            text: text.into(),
            description: Some(description.into()),
        });
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[PaginatorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Always at least 1, so an empty list still renders its header.
    pub fn total_pages(&self) -> usize {
        self.entries.len().div_ceil(self.page_size).max(1)
    }

    /// Header plus the lines of `page`.
    pub fn render(&self, page: usize) -> Vec<String> {
        let total = self.total_pages();
        let page = page.clamp(1, total);

        let mut lines = Vec::with_capacity(self.page_size + 1);
        lines.push(format!("--- {} ({}/{}) ---", self.title, page, total));
        lines.extend(
            self.entries
                .iter()
                .skip((page - 1) * self.page_size)
                .take(self.page_size)
                .map(PaginatorEntry::render),
        );
        lines
    }

    pub fn show(&self, messenger: &dyn Messenger, recipient: &CommandSender, page: usize) {
        for line in self.render(page) {
            messenger.tell(recipient, &line);
        }
    }
}
