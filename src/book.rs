use crate::error::GlyphBookError;
use crate::html::{self, PageStyle};
use crate::layout::LayoutItem;
use crate::paginate::Paginator;
use crate::pdf;
use crate::render::HtmlRenderer;
use crate::report::RunLogger;
use crate::store::{DirGlyphStore, WordGlyphDir};
use crate::types::{PageGeometry, scaled_height};
use std::fs;
use std::path::{Path, PathBuf};

/// Configures and drives a full book run: pagination, page HTML, rendering,
/// compression, and the final merge.
pub struct BookBuilder {
    start: u64,
    max_number: u64,
    geometry: PageGeometry,
    bw: bool,
    inline_images: bool,
    pdf_quality: u8,
    output_dir: PathBuf,
    output_file: Option<String>,
    logger: Option<RunLogger>,
}

impl Default for BookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BookBuilder {
    pub fn new() -> Self {
        Self {
            start: 1,
            max_number: 50_000,
            geometry: PageGeometry::default(),
            bw: false,
            inline_images: false,
            pdf_quality: 70,
            output_dir: PathBuf::from("output"),
            output_file: None,
            logger: None,
        }
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn max_number(mut self, max_number: u64) -> Self {
        self.max_number = max_number;
        self
    }

    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn black_and_white(mut self, bw: bool) -> Self {
        self.bw = bw;
        self
    }

    pub fn inline_images(mut self, inline: bool) -> Self {
        self.inline_images = inline;
        self
    }

    pub fn pdf_quality(mut self, quality: u8) -> Self {
        self.pdf_quality = quality;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_file(mut self, file: impl Into<String>) -> Self {
        self.output_file = Some(file.into());
        self
    }

    pub fn logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn style(&self, normalize_width: bool) -> PageStyle {
        PageStyle {
            bw: self.bw,
            normalize_width,
            inline_images: self.inline_images,
            column_width_px: self.geometry.column_width_px,
        }
    }

    /// Build the number book: title page, table of contents, then one
    /// content page per `next_page` step until the range is exhausted.
    pub fn build_numbers(
        &self,
        store: &DirGlyphStore,
        renderer: &dyn HtmlRenderer,
    ) -> Result<PathBuf, GlyphBookError> {
        let temp_dir = self.output_dir.join("temp_pages");
        fs::create_dir_all(&temp_dir)?;
        let style = self.style(false);

        let mut paginator = Paginator::new(self.start, self.max_number);
        let mut page_pdfs: Vec<PathBuf> = Vec::new();
        while !paginator.is_done() {
            let pending = paginator.pending(&self.geometry);
            let cursor = paginator.cursor();
            let mut items = Vec::with_capacity(pending as usize);
            for number in cursor..cursor + pending {
                let image = store.first_image(number)?;
                let height =
                    scaled_height(image.size, self.geometry.column_width_px, false);
                items.push(LayoutItem::new(number, height, image.path));
            }

            let plan = paginator.next_page(&items, &self.geometry)?;
            let page_html = html::content_page(&plan, &style)?;
            let pdf_path = self.render_page(
                &temp_dir,
                &format!("page_{:04}", plan.page_number - 1),
                &page_html,
                renderer,
            )?;
            if let Some(logger) = &self.logger {
                logger.event(
                    "build.page",
                    &[
                        ("page", &plan.page_number.to_string()),
                        ("start", &plan.start.to_string()),
                        ("end", &plan.end.to_string()),
                    ],
                );
                logger.increment("build.pages", 1);
            }
            page_pdfs.push(pdf_path);
        }

        let toc_entries = paginator.finish();
        let title_pdf = self.render_page(
            &temp_dir,
            "title_page",
            &html::title_page(self.start, self.max_number, &style),
            renderer,
        )?;
        let toc_pdf = self.render_page(
            &temp_dir,
            "toc",
            &html::toc_page(&toc_entries, &style),
            renderer,
        )?;

        let mut ordered = vec![title_pdf, toc_pdf];
        ordered.extend(page_pdfs);
        let final_pdf = self
            .output_dir
            .join(self.output_file.as_deref().unwrap_or("the_numbers.pdf"));
        pdf::merge(&ordered, &final_pdf)?;

        remove_temp_pdfs(&temp_dir)?;
        if let Some(logger) = &self.logger {
            logger.emit_summary("build");
            logger.flush();
        }
        Ok(final_pdf)
    }

    /// Build a word book: every stored occurrence of one word, in order,
    /// width-normalized, without title or contents pages.
    pub fn build_word(
        &self,
        words: &WordGlyphDir,
        word: &str,
        renderer: &dyn HtmlRenderer,
    ) -> Result<PathBuf, GlyphBookError> {
        let images = words.images()?;
        let total = images.len() as u64;
        let temp_dir = self.output_dir.join(format!("temp_pages_{word}"));
        fs::create_dir_all(&temp_dir)?;
        let style = self.style(true);

        let mut paginator = Paginator::new(1, total);
        let mut page_pdfs: Vec<PathBuf> = Vec::new();
        while !paginator.is_done() {
            let pending = paginator.pending(&self.geometry) as usize;
            let cursor = paginator.cursor();
            let offset = (cursor - 1) as usize;
            let items: Vec<LayoutItem<u64>> = images[offset..offset + pending]
                .iter()
                .enumerate()
                .map(|(idx, image)| {
                    let height =
                        scaled_height(image.size, self.geometry.column_width_px, true);
                    LayoutItem::new(cursor + idx as u64, height, image.path.clone())
                })
                .collect();

            let plan = paginator.next_page(&items, &self.geometry)?;
            let page_html = html::content_page(&plan, &style)?;
            let pdf_path = self.render_page(
                &temp_dir,
                &format!("page_{:04}", plan.page_number - 1),
                &page_html,
                renderer,
            )?;
            if let Some(logger) = &self.logger {
                logger.increment("build.pages", 1);
            }
            page_pdfs.push(pdf_path);
        }

        let final_pdf = self
            .output_dir
            .join(match &self.output_file {
                Some(file) => file.clone(),
                None => format!("{word}_book.pdf"),
            });
        pdf::merge(&page_pdfs, &final_pdf)?;

        remove_temp_pdfs(&temp_dir)?;
        if let Some(logger) = &self.logger {
            logger.emit_summary("build-word");
            logger.flush();
        }
        Ok(final_pdf)
    }

    /// Write one page's HTML, render it, and compress the result. The HTML
    /// file is left behind for inspection; only temp PDFs get cleaned up.
    fn render_page(
        &self,
        temp_dir: &Path,
        stem: &str,
        page_html: &str,
        renderer: &dyn HtmlRenderer,
    ) -> Result<PathBuf, GlyphBookError> {
        let html_path = temp_dir.join(format!("{stem}.html"));
        fs::write(&html_path, page_html)?;
        let pdf_path = temp_dir.join(format!("{stem}.pdf"));
        renderer.render(&html_path, &pdf_path)?;
        pdf::compress(&pdf_path, self.pdf_quality)?;
        Ok(pdf_path)
    }
}

fn remove_temp_pdfs(temp_dir: &Path) -> Result<(), GlyphBookError> {
    for entry in fs::read_dir(temp_dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(".pdf"))
        {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
