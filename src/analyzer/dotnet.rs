use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::models::{DependencyDeclaration, Ecosystem};

use super::Entries;

/// Analyzer for SDK-style .NET project files (`*.csproj`, `*.fsproj`,
/// `*.vbproj`).
///
/// Reads `<PackageReference Include="..." Version="..." />`; the version may
/// also be given as a nested `<Version>` element.
pub struct DotNetAnalyzer;

impl DotNetAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

/// A `<PackageReference>` whose closing tag has not been seen yet.
struct OpenReference {
    name: Option<String>,
    version: Option<String>,
    in_version: bool,
}

impl super::Analyzer for DotNetAnalyzer {
    fn analyze(&self, content: &str) -> Result<Entries, ParseError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut open: Option<OpenReference> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) if local_name(e) == "PackageReference" => {
                    let (name, version) = reference_attributes(e);
                    entries.push(to_declaration(name, version));
                }
                Ok(Event::Start(ref e)) => match local_name(e).as_str() {
                    "PackageReference" => {
                        let (name, version) = reference_attributes(e);
                        open = Some(OpenReference {
                            name,
                            version,
                            in_version: false,
                        });
                    }
                    "Version" => {
                        if let Some(reference) = open.as_mut() {
                            reference.in_version = true;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if let Some(reference) = open.as_mut().filter(|r| r.in_version) {
                        if let Ok(text) = e.unescape() {
                            reference.version = Some(text.trim().to_string());
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                    match tag.as_str() {
                        "Version" => {
                            if let Some(reference) = open.as_mut() {
                                reference.in_version = false;
                            }
                        }
                        "PackageReference" => {
                            if let Some(reference) = open.take() {
                                entries.push(to_declaration(reference.name, reference.version));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    // Keep what was read before the document went bad.
                    if entries.is_empty() {
                        return Err(ParseError::new(Ecosystem::NuGet, "project file", e.to_string()));
                    }
                    entries.push(Err(ParseError::new(
                        Ecosystem::NuGet,
                        format!("byte {}", reader.buffer_position()),
                        e.to_string(),
                    )));
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(entries)
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn reference_attributes(e: &BytesStart) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let val = attr.unescape_value().unwrap_or_default().trim().to_string();
        match key.as_str() {
            "Include" => name = Some(val),
            "Version" => version = Some(val),
            _ => {}
        }
    }
    (name, version)
}

fn to_declaration(
    name: Option<String>,
    version: Option<String>,
) -> Result<DependencyDeclaration, ParseError> {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => Ok(DependencyDeclaration::new(Ecosystem::NuGet, name, version)),
        None => Err(ParseError::new(
            Ecosystem::NuGet,
            "PackageReference",
            "missing Include attribute",
        )),
    }
}
