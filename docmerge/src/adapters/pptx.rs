//! PowerPoint (PPTX) adapter.
//!
//! Slides are read in presentation order into [`SlideRecord`]s. There is no
//! PowerPoint writer: a same-format merge produces plain text with one
//! section per presentation, and the result's content format says so.

use super::{FormatAdapter, bounded_preview, count_words};
use crate::config::MergeOptions;
use crate::document::{DocumentMetadata, ProcessorResult, SourceDocument};
use crate::error::Result;
use crate::format::LogicalFormat;
use crate::ooxml::{Package, attr, event_text, local_name, xml_error};
use bytes::Bytes;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PREVIEW_SLIDES: usize = 5;

/// Adapter for PowerPoint presentations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxAdapter;

/// Text content of one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideRecord {
    /// 1-based position in the presentation.
    pub number: usize,
    /// Title placeholder text.
    pub title: Option<String>,
    /// Paragraphs that are not bullets.
    pub body: Vec<String>,
    /// Bulleted paragraphs.
    pub bullets: Vec<String>,
}

impl SlideRecord {
    /// The slide as a few lines of text.
    pub fn to_text(&self) -> String {
        let mut lines = vec![match &self.title {
            Some(title) => format!("Slide {}: {title}", self.number),
            None => format!("Slide {}", self.number),
        }];
        lines.extend(self.body.iter().cloned());
        lines.extend(self.bullets.iter().map(|b| format!("\u{2022} {b}")));
        lines.join("\n")
    }
}

/// A parsed presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    /// Slides in presentation order.
    pub slides: Vec<SlideRecord>,
    /// Pictures, audio and video that could not be carried over.
    pub media: usize,
}

impl Presentation {
    /// Every slide's text, separated by blank lines.
    pub fn text(&self) -> String {
        self.slides
            .iter()
            .map(SlideRecord::to_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl FormatAdapter for PptxAdapter {
    fn format(&self) -> LogicalFormat {
        LogicalFormat::Pptx
    }

    fn analyze(&self, data: &Bytes) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::default();
        let mut package = match Package::open(data, LogicalFormat::Pptx) {
            Ok(package) => package,
            Err(err) => {
                debug!(error = %err, "PPTX analysis failed");
                return metadata;
            }
        };

        if let Err(err) = package.read_core_properties(&mut metadata) {
            debug!(error = %err, "Ignoring unreadable core properties");
        }
        match parse_package(&mut package) {
            Ok(presentation) => {
                metadata.slide_count = Some(presentation.slides.len() as u32);
                metadata.word_count = Some(count_words(&presentation.text()));
            }
            Err(err) => {
                debug!(error = %err, "Could not read slides");
                metadata.slide_count = package.read_app_properties().ok().and_then(|a| a.slides);
            }
        }
        metadata
    }

    fn preview(&self, data: &Bytes) -> String {
        let presentation = match read_presentation(data) {
            Ok(presentation) => presentation,
            Err(_) => return "PowerPoint presentation (unreadable)".to_string(),
        };

        let mut preview = format!(
            "PowerPoint presentation, {} slide(s)",
            presentation.slides.len()
        );
        for slide in presentation.slides.iter().take(PREVIEW_SLIDES) {
            preview.push('\n');
            preview.push_str(&format!(
                "{}. {}",
                slide.number,
                slide.title.as_deref().unwrap_or("(untitled)")
            ));
        }
        bounded_preview(&preview)
    }

    fn extract_text(&self, data: &Bytes) -> Result<String> {
        Ok(read_presentation(data)?.text())
    }

    fn validate_structure(&self, data: &Bytes) -> Result<()> {
        let mut package = Package::open(data, LogicalFormat::Pptx)?;
        package.read_part(PRESENTATION_PART)?;
        slide_parts(&mut package).map(|_| ())
    }

    fn merge_same_format(
        &self,
        sources: &[SourceDocument],
        _options: &MergeOptions,
    ) -> ProcessorResult {
        let mut sections = Vec::with_capacity(sources.len());
        let mut warnings = Vec::new();
        let mut slides = 0usize;
        let mut merged = 0usize;

        for source in sources {
            let marker = format!("===== {} =====", source.name);
            match read_presentation(&source.data) {
                Ok(presentation) => {
                    if presentation.media > 0 {
                        warnings.push(format!(
                            "{}: embedded media not supported, {} item(s) omitted",
                            source.name, presentation.media
                        ));
                    }
                    slides += presentation.slides.len();
                    sections.push(format!("{marker}\n\n{}", presentation.text()));
                    merged += 1;
                }
                Err(err) => {
                    warn!(file = %source.name, error = %err, "Inserting stub for unreadable PPTX");
                    warnings.push(format!("{}: {err}", source.name));
                    sections.push(format!(
                        "{marker}\n\n[Presentation could not be read: {err}]"
                    ));
                }
            }
        }

        if merged == 0 {
            return ProcessorResult::failed("no slides could be read from any input PPTX");
        }

        let mut text = sections.join("\n\n");
        text.push('\n');
        let metadata = DocumentMetadata {
            slide_count: Some(slides as u32),
            word_count: Some(count_words(&text)),
            ..Default::default()
        };
        ProcessorResult::ok(text, LogicalFormat::Txt)
            .with_warnings(warnings)
            .with_metadata(metadata)
    }
}

/// Read every slide of a presentation.
pub fn read_presentation(data: &Bytes) -> Result<Presentation> {
    let mut package = Package::open(data, LogicalFormat::Pptx)?;
    parse_package(&mut package)
}

fn parse_package(package: &mut Package) -> Result<Presentation> {
    let mut presentation = Presentation::default();
    for (index, part) in slide_parts(package)?.into_iter().enumerate() {
        let xml = package.read_part(&part)?;
        let (slide, pictures) = parse_slide(&xml, &part, index + 1)?;
        presentation.slides.push(slide);
        presentation.media += pictures;
    }

    if presentation.media == 0 {
        presentation.media = package
            .part_names()
            .iter()
            .filter(|name| name.starts_with("ppt/media/"))
            .count();
    }
    Ok(presentation)
}

/// Slide part paths in presentation order.
///
/// Uses the slide id list of `ppt/presentation.xml`; without one, slide
/// files are ordered by their number.
fn slide_parts(package: &mut Package) -> Result<Vec<String>> {
    let mut ordered = Vec::new();
    if let Some(xml) = package.read_optional(PRESENTATION_PART)? {
        let rels = package.relationships(PRESENTATION_PART)?;
        let mut reader = Reader::from_str(&xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                    if local_name(e.name().as_ref()) == b"sldId" =>
                {
                    if let Some(part) = relationship_id(e).and_then(|id| rels.get(&id)) {
                        ordered.push(part.clone());
                    }
                }
                Ok(Event::Eof) => break,
                Err(err) => return Err(xml_error(LogicalFormat::Pptx, PRESENTATION_PART, err)),
                _ => {}
            }
            buf.clear();
        }
    }

    if ordered.is_empty() {
        let mut numbered: Vec<(u32, String)> = package
            .part_names()
            .into_iter()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse()
                    .ok()?;
                Some((number, name))
            })
            .collect();
        numbered.sort();
        ordered = numbered.into_iter().map(|(_, name)| name).collect();
    }
    Ok(ordered)
}

fn relationship_id(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| {
            let key = a.key.as_ref();
            key != b"id" && local_name(key) == b"id"
        })
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ShapeRole {
    Title,
    Body,
    Other,
}

#[derive(Default)]
struct ParagraphBuilder {
    text: String,
    bullet: Option<bool>,
}

/// Parse one slide, returning its record and the number of pictures on it.
fn parse_slide(xml: &str, part: &str, number: usize) -> Result<(SlideRecord, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut slide = SlideRecord {
        number,
        ..Default::default()
    };
    let mut pictures = 0usize;
    let mut shape: Option<(ShapeRole, Vec<ParagraphBuilder>)> = None;
    let mut paragraph: Option<ParagraphBuilder> = None;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(LogicalFormat::Pptx, part, err))?;

        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let is_start = matches!(event, Event::Start(_));
                match local_name(e.name().as_ref()) {
                    b"sp" if is_start => shape = Some((ShapeRole::Other, Vec::new())),
                    b"ph" => {
                        if let Some((role, _)) = shape.as_mut() {
                            *role = match attr(e, "type").as_deref() {
                                Some("title") | Some("ctrTitle") => ShapeRole::Title,
                                Some("subTitle") | Some("body") | None => ShapeRole::Body,
                                Some(_) => ShapeRole::Other,
                            };
                        }
                    }
                    b"p" if is_start => paragraph = Some(ParagraphBuilder::default()),
                    b"t" if is_start => in_text = true,
                    b"br" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.text.push(' ');
                        }
                    }
                    b"buChar" | b"buAutoNum" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.bullet = Some(true);
                        }
                    }
                    b"buNone" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.bullet = Some(false);
                        }
                    }
                    b"pic" => pictures += 1,
                    _ => {}
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(done) = paragraph.take() {
                        match shape.as_mut() {
                            Some((_, paragraphs)) => paragraphs.push(done),
                            None => push_line(&mut slide.body, &done.text),
                        }
                    }
                }
                b"sp" => {
                    if let Some((role, paragraphs)) = shape.take() {
                        place_shape(&mut slide, role, paragraphs);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            other => {
                if in_text
                    && let Some(p) = paragraph.as_mut()
                    && let Some(text) = event_text(other)
                {
                    p.text.push_str(&text);
                }
            }
        }
        buf.clear();
    }

    Ok((slide, pictures))
}

fn place_shape(slide: &mut SlideRecord, role: ShapeRole, paragraphs: Vec<ParagraphBuilder>) {
    if role == ShapeRole::Title && slide.title.is_none() {
        let title: Vec<&str> = paragraphs
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !title.is_empty() {
            slide.title = Some(title.join(" "));
            return;
        }
    }

    for p in paragraphs {
        let is_bullet = p.bullet.unwrap_or(role == ShapeRole::Body);
        if is_bullet {
            push_line(&mut slide.bullets, &p.text);
        } else {
            push_line(&mut slide.body, &p.text);
        }
    }
}

fn push_line(lines: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        lines.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocMergeError;
    use crate::ooxml::PackageWriter;

    fn slide_xml(title: &str, bullets: &[&str], picture: bool) -> String {
        let bullets: String = bullets
            .iter()
            .map(|b| format!("<a:p><a:r><a:t>{b}</a:t></a:r></a:p>"))
            .collect();
        let pic = if picture { "<p:pic><p:nvPicPr/></p:pic>" } else { "" };
        format!(
            r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp><p:sp><p:nvSpPr><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:txBody>{bullets}</p:txBody></p:sp><p:sp><p:txBody><a:p><a:pPr><a:buNone/></a:pPr><a:r><a:t>note</a:t></a:r></a:p></p:txBody></p:sp>{pic}</p:spTree></p:cSld></p:sld>"#
        )
    }

    /// Slides written as slide1..slideN but listed in reverse order.
    fn pptx(slides: &[String], reversed: bool) -> Bytes {
        let mut writer = PackageWriter::new();
        let mut ids = String::new();
        let mut rels = String::new();
        for (index, xml) in slides.iter().enumerate() {
            let n = index + 1;
            writer
                .add_part(&format!("ppt/slides/slide{n}.xml"), xml)
                .unwrap();
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="slide" Target="slides/slide{n}.xml"/>"#
            ));
        }
        let order: Vec<usize> = if reversed {
            (1..=slides.len()).rev().collect()
        } else {
            (1..=slides.len()).collect()
        };
        for n in order {
            ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 255 + n));
        }
        writer
            .add_part(
                PRESENTATION_PART,
                &format!(r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
            )
            .unwrap();
        writer
            .add_part(
                "ppt/_rels/presentation.xml.rels",
                &format!("<Relationships>{rels}</Relationships>"),
            )
            .unwrap();
        Bytes::from(writer.finish().unwrap())
    }

    #[test]
    fn test_slide_record() {
        let (slide, pictures) =
            parse_slide(&slide_xml("Agenda", &["one", "two"], true), "s", 1).unwrap();
        assert_eq!(slide.title.as_deref(), Some("Agenda"));
        assert_eq!(slide.bullets, vec!["one", "two"]);
        assert_eq!(slide.body, vec!["note"]);
        assert_eq!(pictures, 1);
        assert_eq!(slide.to_text(), "Slide 1: Agenda\nnote\n\u{2022} one\n\u{2022} two");
    }

    #[test]
    fn test_presentation_order_follows_slide_list() {
        let data = pptx(
            &[slide_xml("First file", &[], false), slide_xml("Second file", &[], false)],
            true,
        );
        let presentation = read_presentation(&data).unwrap();
        let titles: Vec<_> = presentation
            .slides
            .iter()
            .map(|s| s.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["Second file", "First file"]);
        assert_eq!(presentation.slides[0].number, 1);
    }

    #[test]
    fn test_numeric_fallback_order() {
        let mut writer = PackageWriter::new();
        for n in [10, 2, 1] {
            writer
                .add_part(
                    &format!("ppt/slides/slide{n}.xml"),
                    &slide_xml(&format!("S{n}"), &[], false),
                )
                .unwrap();
        }
        let data = Bytes::from(writer.finish().unwrap());
        let presentation = read_presentation(&data).unwrap();
        let titles: Vec<_> = presentation
            .slides
            .iter()
            .filter_map(|s| s.title.as_deref())
            .collect();
        assert_eq!(titles, vec!["S1", "S2", "S10"]);
    }

    #[test]
    fn test_validate_requires_presentation_part() {
        let data = pptx(&[slide_xml("a", &[], false)], false);
        assert!(PptxAdapter.validate_structure(&data).is_ok());

        let mut writer = PackageWriter::new();
        writer.add_part("docProps/app.xml", "<Properties/>").unwrap();
        let bare = Bytes::from(writer.finish().unwrap());
        let err = PptxAdapter.validate_structure(&bare).unwrap_err();
        assert!(matches!(err, DocMergeError::Corrupted { .. }));
        assert!(err.to_string().contains(PRESENTATION_PART));
    }

    #[test]
    fn test_analyze_counts_slides() {
        let data = pptx(&[slide_xml("a", &["x"], false), slide_xml("b", &[], false)], false);
        let metadata = PptxAdapter.analyze(&data);
        assert_eq!(metadata.slide_count, Some(2));
        assert!(PptxAdapter.preview(&data).starts_with("PowerPoint presentation, 2 slide(s)\n1. a"));
    }

    #[test]
    fn test_merge_is_text_with_sections() {
        let a = SourceDocument::new("a.pptx", pptx(&[slide_xml("Alpha", &["x"], true)], false));
        let b = SourceDocument::new("b.pptx", pptx(&[slide_xml("Bravo", &[], false)], false));
        let bad = SourceDocument::new("bad.pptx", Bytes::from_static(b"nope"));

        let result = PptxAdapter.merge_same_format(&[a, bad, b], &MergeOptions::default());
        assert!(result.success);
        assert_eq!(result.content_format, Some(LogicalFormat::Txt));
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("media not supported"));

        let text = String::from_utf8(result.into_data().unwrap().to_vec()).unwrap();
        let alpha = text.find("===== a.pptx =====").unwrap();
        let stub = text.find("[Presentation could not be read").unwrap();
        let bravo = text.find("Slide 1: Bravo").unwrap();
        assert!(alpha < stub && stub < bravo);
    }

    #[test]
    fn test_merge_fails_when_nothing_readable() {
        let bad = SourceDocument::new("bad.pptx", Bytes::from_static(b"nope"));
        let result = PptxAdapter.merge_same_format(&[bad], &MergeOptions::default());
        assert!(!result.success);
    }
}
