//! Default publication writer: EPUB 2 container assembly.
//!
//! Produces a standard EPUB readable by most reading systems: `mimetype`
//! first and uncompressed (the container spec requires it), then
//! `META-INF/container.xml`, the OPF package document, the NCX table of
//! contents, a shared stylesheet, one XHTML file per chapter, and the image
//! payloads. The NCX nav order and the spine both follow the supplied
//! chapter order.
//!
//! Everything is written to an in-memory buffer and returned as bytes; the
//! caller decides whether that becomes a file, an upload, or a validation
//! input.

use crate::error::PublishError;
use crate::pipeline::render::{escape_markup, Chapter};
use crate::ports::{PublicationMetadata, PublicationWriter};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Reader-friendly stylesheet shared by every chapter.
const MAIN_CSS: &str = "\
body {
    font-family: Georgia, 'Times New Roman', serif;
    background-color: #fdf6e3;
    color: #2c2c2c;
    line-height: 1.7;
    margin: 1.5em;
    font-size: 1em;
}
h1, h2, h3 {
    font-family: Helvetica, Arial, sans-serif;
    color: #1a1a1a;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
}
h1 { font-size: 1.8em; border-bottom: 1px solid #ccc; padding-bottom: 0.3em; }
h2 { font-size: 1.4em; }
h3 { font-size: 1.2em; }
p {
    margin-bottom: 0.8em;
    text-align: justify;
}
img {
    max-width: 100%;
    height: auto;
    display: block;
    margin: 1em auto;
}
.chapter-title {
    text-align: center;
    margin-top: 3em;
    margin-bottom: 2em;
}
";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// The default [`PublicationWriter`]: chapters in, EPUB 2 bytes out.
#[derive(Debug, Clone, Default)]
pub struct EpubWriter;

impl EpubWriter {
    pub fn new() -> Self {
        Self
    }
}

impl PublicationWriter for EpubWriter {
    fn write(
        &self,
        meta: &PublicationMetadata,
        chapters: &[Chapter],
    ) -> Result<Vec<u8>, PublishError> {
        write_epub(meta, chapters)
    }
}

/// Assemble the EPUB container in memory.
pub fn write_epub(
    meta: &PublicationMetadata,
    chapters: &[Chapter],
) -> Result<Vec<u8>, PublishError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be first and uncompressed.
    zip.start_file("mimetype", stored)
        .map_err(container_err)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)
        .map_err(container_err)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/style/main.css", deflated)
        .map_err(container_err)?;
    zip.write_all(MAIN_CSS.as_bytes())?;

    // Image filenames are numbered across the whole book, not per chapter,
    // so two chapters can never collide on a name.
    let mut image_counter = 0usize;
    let mut manifest_images: Vec<(String, String)> = Vec::new();

    for (i, chapter) in chapters.iter().enumerate() {
        let mut image_refs: Vec<String> = Vec::new();
        for img in &chapter.images {
            image_counter += 1;
            let filename = format!("images/img_{}.{}", image_counter, img.ext);
            zip.start_file(format!("OEBPS/{filename}"), deflated)
                .map_err(container_err)?;
            zip.write_all(&img.data)?;
            manifest_images.push((filename.clone(), media_type(&img.ext)));
            image_refs.push(filename);
        }

        let xhtml = chapter_xhtml(chapter, &image_refs);
        zip.start_file(format!("OEBPS/chapter_{}.xhtml", i + 1), deflated)
            .map_err(container_err)?;
        zip.write_all(xhtml.as_bytes())?;
    }

    let opf = generate_opf(meta, chapters, &manifest_images);
    zip.start_file("OEBPS/content.opf", deflated)
        .map_err(container_err)?;
    zip.write_all(opf.as_bytes())?;

    let ncx = generate_ncx(meta, chapters);
    zip.start_file("OEBPS/toc.ncx", deflated)
        .map_err(container_err)?;
    zip.write_all(ncx.as_bytes())?;

    let cursor = zip.finish().map_err(container_err)?;
    Ok(cursor.into_inner())
}

fn container_err(e: zip::result::ZipError) -> PublishError {
    PublishError::Container(e.to_string())
}

/// Image media type from the source-reported extension.
fn media_type(ext: &str) -> String {
    if ext.eq_ignore_ascii_case("jpg") {
        "image/jpeg".to_string()
    } else {
        format!("image/{}", ext.to_ascii_lowercase())
    }
}

fn chapter_xhtml(chapter: &Chapter, image_refs: &[String]) -> String {
    let title = escape_markup(&chapter.title);
    let images_html = image_refs
        .iter()
        .map(|r| format!("  <img src=\"{r}\" alt=\"Image\"/>"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{title}</title>
  <link rel="stylesheet" href="style/main.css" type="text/css"/>
</head>
<body>
  <div class="chapter-title"><h1>{title}</h1></div>
{body}
{images_html}
</body>
</html>"#,
        body = chapter.body,
    )
}

fn generate_opf(
    meta: &PublicationMetadata,
    chapters: &[Chapter],
    images: &[(String, String)],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_markup(&meta.title)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_markup(&meta.identifier)
    ));
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", meta.language));
    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"main_style\" href=\"style/main.css\" media-type=\"text/css\"/>\n",
    );
    for (i, _) in chapters.iter().enumerate() {
        opf.push_str(&format!(
            "    <item id=\"chapter_{n}\" href=\"chapter_{n}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            n = i + 1
        ));
    }
    for (i, (href, media)) in images.iter().enumerate() {
        opf.push_str(&format!(
            "    <item id=\"img_{}\" href=\"{}\" media-type=\"{}\"/>\n",
            i + 1,
            href,
            media
        ));
    }
    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for (i, _) in chapters.iter().enumerate() {
        opf.push_str(&format!("    <itemref idref=\"chapter_{}\"/>\n", i + 1));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(meta: &PublicationMetadata, chapters: &[Chapter]) -> String {
    let mut ncx = String::new();
    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_markup(&meta.identifier)
    ));
    ncx.push_str("    <meta name=\"dtb:depth\" content=\"1\"/>\n  </head>\n");
    ncx.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape_markup(&meta.title)
    ));
    for (i, chapter) in chapters.iter().enumerate() {
        let n = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{n}\" playOrder=\"{n}\">\n      <navLabel><text>{title}</text></navLabel>\n      <content src=\"chapter_{n}.xhtml\"/>\n    </navPoint>\n",
            title = escape_markup(&chapter.title),
        ));
    }
    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RawImage;
    use std::io::Read;
    use zip::ZipArchive;

    fn meta() -> PublicationMetadata {
        PublicationMetadata {
            identifier: "job-42".into(),
            title: "A \"Quoted\" Title & More".into(),
            language: "en".into(),
        }
    }

    fn chapter(title: &str, body: &str) -> Chapter {
        Chapter {
            title: title.into(),
            pages: 0..1,
            body: body.into(),
            word_count: body.split_whitespace().count(),
            images: Vec::new(),
        }
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut s = String::new();
        entry.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let bytes = write_epub(&meta(), &[chapter("One", "<p>hi</p>")]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn chapter_files_follow_supplied_order() {
        let bytes = write_epub(
            &meta(),
            &[chapter("One", "<p>a</p>"), chapter("Two", "<p>b</p>")],
        )
        .unwrap();
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        let spine_one = opf.find("idref=\"chapter_1\"").unwrap();
        let spine_two = opf.find("idref=\"chapter_2\"").unwrap();
        assert!(spine_one < spine_two);

        let ncx = read_entry(&bytes, "OEBPS/toc.ncx");
        assert!(ncx.find("One").unwrap() < ncx.find("Two").unwrap());

        let one = read_entry(&bytes, "OEBPS/chapter_1.xhtml");
        assert!(one.contains("<p>a</p>"));
        assert!(one.contains("style/main.css"));
    }

    #[test]
    fn titles_are_escaped_in_every_document() {
        let bytes = write_epub(&meta(), &[chapter("Q & A", "<p>x</p>")]).unwrap();
        let xhtml = read_entry(&bytes, "OEBPS/chapter_1.xhtml");
        assert!(xhtml.contains("<h1>Q &amp; A</h1>"));
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("A &quot;Quoted&quot; Title &amp; More"));
    }

    #[test]
    fn images_are_numbered_across_chapters() {
        let img = |page| RawImage {
            data: vec![0u8; 4],
            ext: "jpg".into(),
            page,
            index: 0,
        };
        let mut one = chapter("One", "<p>a</p>");
        one.images.push(img(0));
        let mut two = chapter("Two", "<p>b</p>");
        two.images.push(img(1));

        let bytes = write_epub(&meta(), &[one, two]).unwrap();
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("href=\"images/img_1.jpg\" media-type=\"image/jpeg\""));
        assert!(opf.contains("href=\"images/img_2.jpg\""));

        let second = read_entry(&bytes, "OEBPS/chapter_2.xhtml");
        assert!(second.contains("img src=\"images/img_2.jpg\""));
        assert!(!second.contains("img_1.jpg"));
    }

    #[test]
    fn media_types() {
        assert_eq!(media_type("jpg"), "image/jpeg");
        assert_eq!(media_type("jpeg"), "image/jpeg");
        assert_eq!(media_type("PNG"), "image/png");
    }

    #[test]
    fn empty_book_still_forms_a_container() {
        let bytes = write_epub(&meta(), &[]).unwrap();
        let container = read_entry(&bytes, "META-INF/container.xml");
        assert!(container.contains("content.opf"));
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("<spine"));
    }
}
