use std::fmt::Display;

/// A parsed page: the top-level contents, doctype included
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Document {
    pub contents: Vec<DOMContent>,
}

impl Document {
    /// What follows the `DOCTYPE` keyword of the first doctype declaration
    pub fn doctype(&self) -> Option<&str> {
        self.contents.iter().find_map(|c| match c {
            DOMContent::Doctype(d) => Some(d["doctype".len()..].trim()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DOMElement {
    pub name: String,
    pub attributes: DOMAttributes,
    pub contents: Vec<DOMContent>,
    /// Written as `<name/>` in the source
    pub self_closing: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DOMContent {
    Element(DOMElement),
    /// Source text, entities left undecoded
    Text(String),
    Comment(String),
    /// Everything between `<!` and `>`, starting with the keyword as written
    Doctype(String),
}

/// Attributes in source order
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DOMAttributes(pub Vec<(String, String)>);

impl DOMAttributes {
    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl DOMElement {
    pub fn new(
        name: impl Display,
        attributes: Option<DOMAttributes>,
        contents: Vec<DOMContent>,
    ) -> Self {
        Self {
            name: name.to_string().to_ascii_lowercase(),
            attributes: attributes.unwrap_or_default(),
            contents,
            self_closing: false,
        }
    }

    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id").map(String::as_str)
    }

    pub fn is_void(&self) -> bool {
        crate::VOID_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_raw_text(&self) -> bool {
        crate::RAW_TEXT_ELEMENTS.contains(&self.name.as_str())
    }

    /// Child elements, skipping text and comments
    pub fn children(&self) -> impl Iterator<Item = &DOMElement> {
        self.contents.iter().filter_map(|c| match c {
            DOMContent::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Elements named `name`, either direct children only or all descendants
    pub fn get_elements_by_name(&self, name: &str, recursive: bool) -> Vec<&DOMElement> {
        if recursive {
            crate::query::Descendants::of(&self.contents)
                .filter(|(_, e, _)| e.name == name)
                .map(|(_, e, _)| e)
                .collect()
        } else {
            self.children().filter(|e| e.name == name).collect()
        }
    }
}

// Deep trees would otherwise be dropped recursively, one stack frame per level
impl Drop for DOMElement {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.contents);
        while let Some(content) = pending.pop() {
            if let DOMContent::Element(mut e) = content {
                pending.append(&mut e.contents);
            }
        }
    }
}

impl From<DOMElement> for DOMContent {
    fn from(e: DOMElement) -> Self {
        DOMContent::Element(e)
    }
}

impl From<&str> for DOMContent {
    fn from(s: &str) -> Self {
        DOMContent::Text(s.to_string())
    }
}

impl From<String> for DOMContent {
    fn from(s: String) -> Self {
        DOMContent::Text(s)
    }
}
