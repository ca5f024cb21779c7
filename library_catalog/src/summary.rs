use crate::api::BorrowSummary;

#[derive(Debug, Clone, PartialEq)]
/// One line of the borrow summary report
pub struct SummaryRow {
    pub title: String,
    pub isbn: String,
    pub total_quantity: u64,
    /// Share of all borrowed copies, 0 when nothing was borrowed
    pub percentage: f64,
}

impl SummaryRow {
    /// Percentage with one decimal place, e.g. `75.0%`
    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BorrowSummaryReport {
    pub total_borrowed_books: u64,
    pub unique_titles: usize,
    /// Rounded to one decimal place
    pub average_per_book: f64,
    /// Same order as the summaries the report was built from
    pub rows: Vec<SummaryRow>,
}

impl BorrowSummaryReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn summarize(summaries: &[BorrowSummary]) -> BorrowSummaryReport {
    let total_borrowed_books = summaries
        .iter()
        .map(|entry| entry.total_quantity)
        .fold(0u64, u64::saturating_add);
    let unique_titles = summaries.len();

    let average_per_book = if unique_titles > 0 {
        round_to_tenth(total_borrowed_books as f64 / unique_titles as f64)
    } else {
        0.0
    };

    let rows = summaries
        .iter()
        .map(|entry| SummaryRow {
            title: entry.book.title.clone(),
            isbn: entry.book.isbn.clone(),
            total_quantity: entry.total_quantity,
            percentage: percentage_of(entry.total_quantity, total_borrowed_books),
        })
        .collect();

    BorrowSummaryReport {
        total_borrowed_books,
        unique_titles,
        average_per_book,
        rows,
    }
}

fn percentage_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
