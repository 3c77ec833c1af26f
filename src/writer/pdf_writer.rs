//! PDF document writer.
//!
//! Assembles complete PDF documents with proper structure:
//! header, body, xref table, and trailer. A document may carry one signature
//! field; its `/Contents` and `/ByteRange` values are placeholders handed out
//! through [`PlaceholderFactory`] and patched after the single write pass.

use super::appearance::{signing_date, AppearanceHandler, DefaultAppearance, APPEARANCE_FONT};
use super::content_stream::ContentStreamBuilder;
use super::object_serializer::ObjectSerializer;
use super::output::{CountingWriter, PositionedWrite};
use super::placeholder::{PlaceholderFactory, PlaceholderField};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::Object;
use crate::signatures::{
    ByteRangeDescriptor, SignOptions, SignatureMetadata, SignatureOrchestrator,
    SignatureSubFilter, Signer,
};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Base-14 fonts available to page content, with their resource names.
const STANDARD_FONTS: &[(&str, &str)] = &[
    ("Helvetica", "Helvetica"),
    ("HelveticaBold", "Helvetica-Bold"),
    ("TimesRoman", "Times-Roman"),
    ("Courier", "Courier"),
];

/// Annotation flags for signature widgets: Print | Locked.
const WIDGET_FLAGS: i64 = 4 | 128;

/// AcroForm SigFlags: SignaturesExist | AppendOnly.
const SIG_FLAGS: i64 = 3;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Whether to compress streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            subject: None,
            creator: Some("pdf_inplace_sign".to_string()),
            compress: true,
        }
    }
}

impl PdfWriterConfig {
    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, content streams are compressed using FlateDecode
    /// (zlib/deflate) to reduce file size.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for FlateDecode filter.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Lifecycle notifications around one save.
///
/// `on_before_save` runs before any byte is written and may create
/// placeholders; `on_after_save` runs once the whole document is in
/// `output` and may patch it in place.
pub trait SaveHook {
    /// Called before serialization starts.
    fn on_before_save(&mut self, document: &mut dyn PlaceholderFactory) -> Result<()>;

    /// Called after serialization with the complete, seekable output.
    fn on_after_save(&mut self, output: &mut dyn OutputHandle) -> Result<()>;
}

/// Random-access output used for in-place patching.
pub trait OutputHandle: Read + Write + Seek {}

impl<T: Read + Write + Seek> OutputHandle for T {}

/// A signature form field and its widget.
pub struct SignatureField {
    /// Field name (`/T`)
    pub name: String,
    /// Zero-based index of the page carrying the widget
    pub page: usize,
    /// Widget box on the page; `None` for an invisible signature
    pub rect: Option<Rect>,
    /// Entries of the signature dictionary
    pub metadata: SignatureMetadata,
    /// Signature format
    pub sub_filter: SignatureSubFilter,
    appearance: Option<Box<dyn AppearanceHandler>>,
}

impl SignatureField {
    /// An invisible signature field on the first page.
    ///
    /// In a document without pages the field is listed only in `/AcroForm`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page: 0,
            rect: None,
            metadata: SignatureMetadata::default(),
            sub_filter: SignatureSubFilter::default(),
            appearance: None,
        }
    }

    /// Place the widget on `page`.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Make the signature visible inside `rect`.
    pub fn visible(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Set the dictionary metadata.
    pub fn with_metadata(mut self, metadata: SignatureMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the sub-filter.
    pub fn with_sub_filter(mut self, sub_filter: SignatureSubFilter) -> Self {
        self.sub_filter = sub_filter;
        self
    }

    /// Draw the visible widget with `handler` instead of [`DefaultAppearance`].
    pub fn with_appearance(mut self, handler: impl AppearanceHandler + 'static) -> Self {
        self.appearance = Some(Box::new(handler));
        self
    }

    /// Whether the widget has a visible box.
    pub fn is_visible(&self) -> bool {
        self.rect.is_some_and(|r| !r.is_empty())
    }
}

impl fmt::Debug for SignatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureField")
            .field("name", &self.name)
            .field("page", &self.page)
            .field("rect", &self.rect)
            .field("metadata", &self.metadata)
            .field("sub_filter", &self.sub_filter)
            .field("custom_appearance", &self.appearance.is_some())
            .finish()
    }
}

/// Signature field plus the placeholders reserved for it.
#[derive(Debug)]
struct SignatureSlot {
    field: SignatureField,
    contents: Option<PlaceholderField>,
    byte_range: Option<PlaceholderField>,
}

impl SignatureSlot {
    /// Both values reserved, so a signature dictionary is written.
    fn is_reserved(&self) -> bool {
        self.contents.is_some() && self.byte_range.is_some()
    }
}

/// A page being built.
pub struct PageBuilder<'a> {
    writer: &'a mut PdfWriter,
    page_index: usize,
}

impl<'a> PageBuilder<'a> {
    /// Add text to the page.
    ///
    /// `font_name` is a base-14 font name such as `Helvetica` or `Times-Roman`.
    pub fn add_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font_name: &str,
        font_size: f32,
    ) -> &mut Self {
        let resource = font_resource_name(font_name);
        let page = &mut self.writer.pages[self.page_index];
        page.content_builder
            .set_font(&resource, font_size)
            .text(text, x, y);
        self
    }

    /// Draw a rectangle on the page.
    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        let page = &mut self.writer.pages[self.page_index];
        page.content_builder.rect(x, y, width, height).stroke();
        self
    }

    /// Finish building this page and return to the writer.
    pub fn finish(self) -> &'a mut PdfWriter {
        let page = &mut self.writer.pages[self.page_index];
        page.content_builder.end_text();
        self.writer
    }
}

fn font_resource_name(font_name: &str) -> String {
    font_name.replace('-', "")
}

/// Internal page data.
#[derive(Debug)]
struct PageData {
    width: f32,
    height: f32,
    content_builder: ContentStreamBuilder,
}

/// Object ids assigned for one write pass.
struct Layout {
    catalog: u32,
    pages: u32,
    fonts: Vec<(&'static str, &'static str, u32)>,
    page_ids: Vec<(u32, u32)>,
    info: u32,
    signature: Option<SignatureIds>,
    size: u32,
}

struct SignatureIds {
    sig_dict: Option<u32>,
    widget: u32,
    appearance: Option<u32>,
}

impl Layout {
    fn new(page_count: usize, signature: Option<&SignatureSlot>) -> Self {
        let mut next = 1;
        let mut alloc = || {
            let id = next;
            next += 1;
            id
        };

        let catalog = alloc();
        let pages = alloc();
        let fonts = STANDARD_FONTS
            .iter()
            .map(|&(resource, base)| (resource, base, alloc()))
            .collect();
        let page_ids = (0..page_count).map(|_| (alloc(), alloc())).collect();
        let info = alloc();
        let signature = signature.map(|slot| SignatureIds {
            sig_dict: slot.is_reserved().then(&mut alloc),
            widget: alloc(),
            appearance: slot.field.is_visible().then(&mut alloc),
        });

        Self {
            catalog,
            pages,
            fonts,
            page_ids,
            info,
            signature,
            size: next,
        }
    }
}

/// PDF document writer.
///
/// Builds a complete PDF document with pages, fonts, and at most one
/// signature field.
#[derive(Debug)]
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<PageData>,
    signature: Option<SignatureSlot>,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            signature: None,
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Add a page with the given dimensions.
    pub fn add_page(&mut self, width: f32, height: f32) -> PageBuilder<'_> {
        let page_index = self.pages.len();
        self.pages.push(PageData {
            width,
            height,
            content_builder: ContentStreamBuilder::new(),
        });
        PageBuilder {
            writer: self,
            page_index,
        }
    }

    /// Add a US Letter sized page (8.5" x 11").
    pub fn add_letter_page(&mut self) -> PageBuilder<'_> {
        self.add_page(612.0, 792.0)
    }

    /// Add an A4 sized page (210mm x 297mm).
    pub fn add_a4_page(&mut self) -> PageBuilder<'_> {
        self.add_page(595.0, 842.0)
    }

    /// Add the document's signature field.
    ///
    /// Only one signature field per document is supported.
    pub fn add_signature_field(&mut self, field: SignatureField) -> Result<()> {
        if let Some(existing) = &self.signature {
            return Err(Error::Unsupported(format!(
                "Second signature field {:?}; document already has {:?}",
                field.name, existing.field.name
            )));
        }
        self.signature = Some(SignatureSlot {
            field,
            contents: None,
            byte_range: None,
        });
        Ok(())
    }

    /// The signature field, if one was added.
    pub fn signature_field(&self) -> Option<&SignatureField> {
        self.signature.as_ref().map(|slot| &slot.field)
    }

    /// Serialize once into `output`, notifying `hook` before and after.
    ///
    /// `output` must be empty. After a hook error the output is incomplete
    /// or unpatched and must be discarded.
    pub fn save_with<O>(&mut self, output: &mut O, hook: &mut dyn SaveHook) -> Result<()>
    where
        O: Read + Write + Seek,
    {
        self.validate()?;
        let existing = output.seek(SeekFrom::End(0))?;
        if existing != 0 {
            return Err(Error::InvalidPdf(format!(
                "Output must be empty before saving, found {} bytes",
                existing
            )));
        }

        if let Some(slot) = self.signature.as_mut() {
            if slot.field.metadata.signing_time.is_none() {
                slot.field.metadata.signing_time = Some(Utc::now());
            }
        }

        hook.on_before_save(self)?;

        let mut writer = CountingWriter::new(&mut *output);
        self.write_document(&mut writer)?;
        writer.flush()?;
        log::debug!("Wrote {} bytes", writer.position());

        hook.on_after_save(output)
    }

    /// Save and sign in place into `output`.
    ///
    /// The signer's sub-filter and name are used for the signature
    /// dictionary unless the field sets its own name.
    pub fn sign_to<S, O>(
        &mut self,
        output: &mut O,
        signer: S,
        options: SignOptions,
    ) -> Result<ByteRangeDescriptor>
    where
        S: Signer,
        O: Read + Write + Seek,
    {
        let slot = self
            .signature
            .as_mut()
            .ok_or_else(|| Error::InvalidPdf("Document has no signature field".to_string()))?;
        slot.field.sub_filter = signer.sub_filter();
        if slot.field.metadata.name.is_none() {
            slot.field.metadata.name = signer.signer_name();
        }

        let mut orchestrator = SignatureOrchestrator::new(signer, options);
        self.save_with(output, &mut orchestrator)?;
        orchestrator.last_byte_range().ok_or_else(|| Error::InvalidState {
            expected: "Patched".to_string(),
            found: orchestrator.state().to_string(),
        })
    }

    /// Save and sign into a new buffer.
    pub fn sign_to_vec<S: Signer>(&mut self, signer: S, options: SignOptions) -> Result<Vec<u8>> {
        let mut output = Cursor::new(Vec::new());
        self.sign_to(&mut output, signer, options)?;
        Ok(output.into_inner())
    }

    /// Save and sign into a file at `path`.
    ///
    /// The file is removed again if signing fails.
    pub fn sign_to_file<S: Signer>(
        &mut self,
        path: impl AsRef<Path>,
        signer: S,
        options: SignOptions,
    ) -> Result<ByteRangeDescriptor> {
        let path = path.as_ref();
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let result = self.sign_to(&mut file, signer, options).and_then(|descriptor| {
            file.sync_all()?;
            Ok(descriptor)
        });
        if result.is_err() {
            drop(file);
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
        result
    }

    /// Build the complete PDF document without signing it.
    ///
    /// A signature field is written as an empty field.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.validate()?;
        if let Some(slot) = self.signature.as_mut() {
            slot.contents = None;
            slot.byte_range = None;
        }
        let mut output = Vec::new();
        self.write_document(&mut output)?;
        Ok(output)
    }

    /// Save the unsigned PDF to a file.
    pub fn save(self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(slot) = &self.signature {
            // An invisible field needs no page; it only lives in /AcroForm /Fields
            let pageless = self.pages.is_empty() && slot.field.page == 0;
            if pageless && slot.field.is_visible() {
                return Err(Error::InvalidPdf(format!(
                    "Visible signature field {:?} needs a page",
                    slot.field.name
                )));
            }
            if !pageless && slot.field.page >= self.pages.len() {
                return Err(Error::InvalidPdf(format!(
                    "Signature field {:?} is on page {} but the document has {} pages",
                    slot.field.name,
                    slot.field.page,
                    self.pages.len()
                )));
            }
        }
        Ok(())
    }

    /// Stream bytes and dict, compressed when configured.
    fn make_stream(&self, mut dict: HashMap<String, Object>, raw: Vec<u8>) -> Object {
        let data = if self.config.compress {
            match compress_data(&raw) {
                Ok(compressed) => {
                    dict.insert("Filter".to_string(), ObjectSerializer::name("FlateDecode"));
                    compressed
                },
                Err(e) => {
                    log::warn!("Stream compression failed, writing uncompressed: {}", e);
                    raw
                },
            }
        } else {
            raw
        };
        Object::Stream {
            dict,
            data: bytes::Bytes::from(data),
        }
    }

    /// Single write pass over the whole document.
    fn write_document<W: PositionedWrite>(&self, output: &mut W) -> Result<()> {
        let serializer = ObjectSerializer::compact();
        let layout = Layout::new(self.pages.len(), self.signature.as_ref());
        let mut objects: Vec<(u32, Object)> = Vec::new();

        let font_resources: HashMap<String, Object> = layout
            .fonts
            .iter()
            .map(|&(resource, _, id)| (resource.to_string(), ObjectSerializer::reference(id, 0)))
            .collect();

        let mut catalog_entries = vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", ObjectSerializer::reference(layout.pages, 0)),
        ];
        if let Some(ids) = &layout.signature {
            catalog_entries.push((
                "AcroForm",
                ObjectSerializer::dict(vec![
                    ("Fields", Object::Array(vec![ObjectSerializer::reference(ids.widget, 0)])),
                    ("SigFlags", ObjectSerializer::integer(SIG_FLAGS)),
                ]),
            ));
        }
        objects.push((layout.catalog, ObjectSerializer::dict(catalog_entries)));

        let kids = layout
            .page_ids
            .iter()
            .map(|&(page_id, _)| ObjectSerializer::reference(page_id, 0))
            .collect();
        objects.push((
            layout.pages,
            ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Pages")),
                ("Kids", Object::Array(kids)),
                ("Count", ObjectSerializer::integer(self.pages.len() as i64)),
            ]),
        ));

        for &(_, base, id) in &layout.fonts {
            objects.push((
                id,
                ObjectSerializer::dict(vec![
                    ("Type", ObjectSerializer::name("Font")),
                    ("Subtype", ObjectSerializer::name("Type1")),
                    ("BaseFont", ObjectSerializer::name(base)),
                    ("Encoding", ObjectSerializer::name("WinAnsiEncoding")),
                ]),
            ));
        }

        for (index, page_data) in self.pages.iter().enumerate() {
            let (page_id, content_id) = layout.page_ids[index];
            let raw_content = page_data.content_builder.clone().build()?;

            let mut page_entries = vec![
                ("Type", ObjectSerializer::name("Page")),
                ("Parent", ObjectSerializer::reference(layout.pages, 0)),
                (
                    "MediaBox",
                    ObjectSerializer::rect(
                        0.0,
                        0.0,
                        page_data.width as f64,
                        page_data.height as f64,
                    ),
                ),
                ("Contents", ObjectSerializer::reference(content_id, 0)),
                (
                    "Resources",
                    ObjectSerializer::dict(vec![(
                        "Font",
                        Object::Dictionary(font_resources.clone()),
                    )]),
                ),
            ];
            if let (Some(slot), Some(ids)) = (&self.signature, &layout.signature) {
                if slot.field.page == index {
                    page_entries.push((
                        "Annots",
                        Object::Array(vec![ObjectSerializer::reference(ids.widget, 0)]),
                    ));
                }
            }

            objects.push((page_id, ObjectSerializer::dict(page_entries)));
            objects.push((content_id, self.make_stream(HashMap::new(), raw_content)));
        }

        let mut info_entries = Vec::new();
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::string(title)));
        }
        if let Some(author) = &self.config.author {
            info_entries.push(("Author", ObjectSerializer::string(author)));
        }
        if let Some(subject) = &self.config.subject {
            info_entries.push(("Subject", ObjectSerializer::string(subject)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::string(creator)));
        }
        objects.push((layout.info, ObjectSerializer::dict(info_entries)));

        if let (Some(slot), Some(ids)) = (&self.signature, &layout.signature) {
            self.signature_objects(slot, ids, &layout, &font_resources, &mut objects)?;
        }

        // Write all objects
        writeln!(output, "%PDF-{}", self.config.version)?;
        // Binary marker (recommended for binary content)
        output.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        let mut xref_offsets: Vec<(u32, u64)> = Vec::with_capacity(objects.len());
        for (id, obj) in &objects {
            xref_offsets.push((*id, output.position()));
            serializer.write_indirect(output, *id, 0, obj)?;
        }

        let xref_start = output.position();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", layout.size)?;
        // Object 0 is always free
        writeln!(output, "0000000000 65535 f ")?;
        xref_offsets.sort_by_key(|(id, _)| *id);
        for (_, offset) in &xref_offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(layout.size as i64)),
            ("Root", ObjectSerializer::reference(layout.catalog, 0)),
            ("Info", ObjectSerializer::reference(layout.info, 0)),
        ]);
        writeln!(output, "trailer")?;
        serializer.write_object(output, &trailer)?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;
        Ok(())
    }

    /// Signature dictionary, widget and appearance objects.
    fn signature_objects(
        &self,
        slot: &SignatureSlot,
        ids: &SignatureIds,
        layout: &Layout,
        font_resources: &HashMap<String, Object>,
        objects: &mut Vec<(u32, Object)>,
    ) -> Result<()> {
        let field = &slot.field;
        let widget_rect = field.rect.filter(|r| !r.is_empty()).unwrap_or_else(Rect::zero);

        let mut widget_entries = vec![
            ("Type", ObjectSerializer::name("Annot")),
            ("Subtype", ObjectSerializer::name("Widget")),
            ("FT", ObjectSerializer::name("Sig")),
            ("T", ObjectSerializer::string(&field.name)),
            ("F", ObjectSerializer::integer(WIDGET_FLAGS)),
            ("Rect", widget_rect.to_pdf_array()),
        ];
        if let Some(&(page_id, _)) = layout.page_ids.get(field.page) {
            widget_entries.push(("P", ObjectSerializer::reference(page_id, 0)));
        }

        if let (Some(sig_id), Some(contents), Some(byte_range)) =
            (ids.sig_dict, &slot.contents, &slot.byte_range)
        {
            let metadata = &field.metadata;
            let mut sig_entries = vec![
                ("Type", ObjectSerializer::name("Sig")),
                ("Filter", ObjectSerializer::name("Adobe.PPKLite")),
                ("SubFilter", ObjectSerializer::name(field.sub_filter.as_pdf_name())),
                ("ByteRange", Object::Placeholder(byte_range.clone())),
                ("Contents", Object::Placeholder(contents.clone())),
            ];
            if let Some(date) = signing_date(metadata) {
                sig_entries.push(("M", ObjectSerializer::string(&date)));
            }
            if let Some(name) = &metadata.name {
                sig_entries.push(("Name", ObjectSerializer::string(name)));
            }
            if let Some(reason) = &metadata.reason {
                sig_entries.push(("Reason", ObjectSerializer::string(reason)));
            }
            if let Some(location) = &metadata.location {
                sig_entries.push(("Location", ObjectSerializer::string(location)));
            }
            if let Some(contact) = &metadata.contact_info {
                sig_entries.push(("ContactInfo", ObjectSerializer::string(contact)));
            }
            objects.push((sig_id, ObjectSerializer::dict(sig_entries)));
            widget_entries.push(("V", ObjectSerializer::reference(sig_id, 0)));
        }

        if let Some(ap_id) = ids.appearance {
            let mut content = ContentStreamBuilder::new();
            let form_rect = Rect::new(0.0, 0.0, widget_rect.width, widget_rect.height);
            match &field.appearance {
                Some(handler) => handler.draw(&mut content, form_rect),
                None => DefaultAppearance::new(field.metadata.clone()).draw(&mut content, form_rect),
            }

            let mut helv = HashMap::new();
            if let Some(helvetica) = font_resources.get("Helvetica") {
                helv.insert(APPEARANCE_FONT.to_string(), helvetica.clone());
            }
            let mut form_dict = HashMap::new();
            form_dict.insert("Type".to_string(), ObjectSerializer::name("XObject"));
            form_dict.insert("Subtype".to_string(), ObjectSerializer::name("Form"));
            form_dict.insert("BBox".to_string(), widget_rect.to_bbox_array());
            form_dict.insert(
                "Resources".to_string(),
                ObjectSerializer::dict(vec![("Font", Object::Dictionary(helv))]),
            );

            objects.push((ap_id, self.make_stream(form_dict, content.build()?)));
            widget_entries.push((
                "AP",
                ObjectSerializer::dict(vec![("N", ObjectSerializer::reference(ap_id, 0))]),
            ));
        }

        objects.push((ids.widget, ObjectSerializer::dict(widget_entries)));
        Ok(())
    }
}

impl PlaceholderFactory for PdfWriter {
    fn create_hex_placeholder(&mut self, width: usize) -> Result<PlaceholderField> {
        let slot = self.signature.as_mut().ok_or_else(|| {
            Error::InvalidPdf("Cannot reserve /Contents without a signature field".to_string())
        })?;
        let field = PlaceholderField::hex(width)?;
        slot.contents = Some(field.clone());
        Ok(field)
    }

    fn create_integer_array_placeholder(
        &mut self,
        count: usize,
        max_digits: usize,
    ) -> Result<PlaceholderField> {
        let slot = self.signature.as_mut().ok_or_else(|| {
            Error::InvalidPdf("Cannot reserve /ByteRange without a signature field".to_string())
        })?;
        let field = PlaceholderField::integer_array(count, max_digits)?;
        slot.byte_range = Some(field.clone());
        Ok(field)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}
