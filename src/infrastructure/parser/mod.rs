mod pdf;

pub use pdf::PdfParser;
