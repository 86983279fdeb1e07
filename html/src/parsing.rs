use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_until, take_while},
    character::complete::{alpha1, alphanumeric1, char, multispace0, multispace1},
    combinator::{opt, recognize, verify},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use tracing::{span, trace, Level};

use super::dom::*;

/// Markup which could not be turned into a tree
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("could not parse markup at byte {offset}: {snippet:?}")]
pub struct ParseError {
    pub offset: usize,
    pub snippet: String,
}

impl ParseError {
    fn at(source: &str, rest: &str) -> Self {
        Self {
            offset: source.len() - rest.len(),
            snippet: rest.chars().take(32).collect(),
        }
    }

    fn from_nom(source: &str, err: nom::Err<nom::error::Error<&str>>) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => Self::at(source, e.input),
            nom::Err::Incomplete(_) => Self::at(source, ""),
        }
    }
}

/// Attempt to parse a string as a valid tag name
fn parse_tag_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alpha1,
        many0_count(alt((alphanumeric1, tag("-"), tag(":")))),
    ))(input)
}

/// Parse a tag in the form `</name>`, returning `name`
fn parse_close_tag(input: &str) -> IResult<&str, &str> {
    let (remaining, (_, name, _, _)) =
        tuple((tag("</"), parse_tag_name, multispace0, char('>')))(input)?;
    Ok((remaining, name))
}

/// Parse a tag in the form `<name attr=value ...>` or `<name ... />`, returning the
/// [`DOMElement`] without contents
fn parse_open_tag(input: &str) -> IResult<&str, DOMElement> {
    let (rest, (_, name, attrs, _, slash, _)) = tuple((
        char('<'),
        parse_tag_name,
        all_attr_parser,
        multispace0,
        opt(char('/')),
        char('>'),
    ))(input)?;
    let mut element = DOMElement::new(
        name,
        Some(DOMAttributes(
            attrs
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
        )),
        vec![],
    );
    element.self_closing = slash.is_some();
    Ok((rest, element))
}

/// Parse a `<!-- ... -->` comment, returning its body
fn parse_comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("<!--"), take_until("-->"), tag("-->"))(input)
}

/// Parse a `<!DOCTYPE ...>` declaration, returning what lies between `<!` and `>`
fn parse_doctype(input: &str) -> IResult<&str, &str> {
    delimited(
        tag("<!"),
        recognize(pair(tag_no_case("doctype"), take_until(">"))),
        char('>'),
    )(input)
}

/// Parse the content between tags, returning the text within
fn parse_text(input: &str) -> IResult<&str, &str> {
    is_not("<")(input)
}

/// The body of a `script` or `style` element up to and including its closing tag
fn parse_raw_text<'a>(input: &'a str, name: &str) -> IResult<&'a str, &'a str> {
    let close = format!("</{}", name);
    let (rest, body) = take_until(close.as_str())(input)?;
    let (rest, _) = verify(parse_close_tag, |n: &str| n.eq_ignore_ascii_case(name))(rest)?;
    Ok((rest, body))
}

/// An element whose closing tag has not been seen yet
struct Frame<'a> {
    element: DOMElement,
    /// The opening tag as written, kept in case the element is never closed
    open_tag: &'a str,
}

/// Builds the tree on an explicit stack, so neither nesting depth nor unclosed
/// elements cost more than one pass over the input.
#[derive(Default)]
struct TreeBuilder<'a> {
    stack: Vec<Frame<'a>>,
    top: Vec<DOMContent>,
}

impl<'a> TreeBuilder<'a> {
    fn push(&mut self, content: DOMContent) {
        let contents = match self.stack.last_mut() {
            Some(frame) => &mut frame.element.contents,
            None => &mut self.top,
        };
        if let DOMContent::Text(next) = &content {
            if let Some(DOMContent::Text(prev)) = contents.last_mut() {
                prev.push_str(next);
                return;
            }
        }
        contents.push(content);
    }

    fn open(&mut self, element: DOMElement, open_tag: &'a str) {
        self.stack.push(Frame { element, open_tag });
    }

    /// Close the innermost open element named `name`. Elements opened inside it
    /// turn back into text. Returns false when no open element has that name, in
    /// which case every open element has turned into text.
    fn close(&mut self, name: &str) -> bool {
        match self
            .stack
            .iter()
            .rposition(|f| f.element.name.eq_ignore_ascii_case(name))
        {
            Some(depth) => {
                self.unwind_from(depth + 1);
                if let Some(frame) = self.stack.pop() {
                    self.push(DOMContent::Element(frame.element));
                }
                true
            }
            None => {
                self.unwind_from(0);
                false
            }
        }
    }

    /// Put back every element opened at `depth` or deeper as its opening tag
    /// followed by its contents, outermost first
    fn unwind_from(&mut self, depth: usize) {
        for frame in self.stack.split_off(depth) {
            let Frame {
                mut element,
                open_tag,
            } = frame;
            self.push(DOMContent::Text(open_tag.to_string()));
            for content in std::mem::take(&mut element.contents) {
                self.push(content);
            }
        }
    }

    fn finish(mut self) -> Vec<DOMContent> {
        self.unwind_from(0);
        self.top
    }
}

/// Parse a run of contents. Stops at a closing tag that closes nothing, or at a
/// `</` that is no closing tag at all, returning the remainder from there.
fn parse_contents(input: &str) -> (&str, Vec<DOMContent>) {
    let mut builder = TreeBuilder::default();
    let mut rest = input;
    while !rest.is_empty() {
        if let Ok((next, text)) = parse_text(rest) {
            builder.push(DOMContent::Text(text.to_string()));
            rest = next;
        } else if let Ok((next, comment)) = parse_comment(rest) {
            builder.push(DOMContent::Comment(comment.to_string()));
            rest = next;
        } else if let Ok((next, doctype)) = parse_doctype(rest) {
            builder.push(DOMContent::Doctype(doctype.to_string()));
            rest = next;
        } else if rest.starts_with("</") {
            match parse_close_tag(rest) {
                Ok((next, name)) if builder.close(name) => rest = next,
                _ => break,
            }
        } else if let Ok((next, mut element)) = parse_open_tag(rest) {
            let open_tag = &rest[..rest.len() - next.len()];
            rest = next;
            if element.self_closing || element.is_void() {
                builder.push(DOMContent::Element(element));
            } else if element.is_raw_text() {
                match parse_raw_text(rest, &element.name) {
                    Ok((next, body)) => {
                        if !body.is_empty() {
                            element.contents.push(DOMContent::Text(body.to_string()));
                        }
                        builder.push(DOMContent::Element(element));
                        rest = next;
                    }
                    Err(_) => builder.push(DOMContent::Text(open_tag.to_string())),
                }
            } else {
                builder.open(element, open_tag);
            }
        } else {
            // A `<` which opens neither a tag nor a comment is kept as text
            builder.push(DOMContent::Text("<".to_string()));
            rest = &rest[1..];
        }
    }
    (rest, builder.finish())
}

/// Parse a whole page. Parsing stops at the first markup that cannot be part of the
/// tree, such as a closing tag with no matching opening tag; the unparsed remainder
/// is returned.
pub fn document(input: &str) -> IResult<&str, Document> {
    let span = span!(Level::DEBUG, "Parsing document", len = input.len());
    let _enter = span.enter();
    let (rest, contents) = parse_contents(input);
    trace!(nodes = contents.len(), remaining = rest.len(), "Parsed document");
    Ok((rest, Document { contents }))
}

/// Parse a whole page, failing unless all of `input` is consumed
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    match document(input) {
        Ok(("", doc)) => Ok(doc),
        Ok((rest, _)) => Err(ParseError::at(input, rest)),
        Err(e) => Err(ParseError::from_nom(input, e)),
    }
}

/// Parse inner markup, as assigned to an element, into its new contents
pub fn fragment(input: &str) -> Result<Vec<DOMContent>, ParseError> {
    match parse_contents(input) {
        ("", contents) => Ok(contents),
        (rest, _) => Err(ParseError::at(input, rest)),
    }
}

// Attribute parsing below

fn parse_single_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c: char| c != '\''), char('\''))(input)
}

fn parse_double_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn parse_unquoted(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'=<>`")(input)
}

fn value_parser(input: &str) -> IResult<&str, &str> {
    alt((parse_single_quoted, parse_double_quoted, parse_unquoted))(input)
}

fn name_parser(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'>/=")(input)
}

fn single_attr_parser(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, (name, value)) = pair(
        name_parser,
        opt(preceded(
            tuple((multispace0, char('='), multispace0)),
            value_parser,
        )),
    )(input)?;
    Ok((rest, (name, value.unwrap_or(""))))
}

fn all_attr_parser(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    many0(preceded(multispace1, single_attr_parser))(input)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::attributes;

    #[test]
    fn test_node_parse() {
        let data = r#"<html><div class=nothing><h1></h1></div></html>"#;
        let target = DOMElement::new(
            "html",
            None,
            vec![DOMElement::new(
                "div",
                Some(attributes!(class=>"nothing")),
                vec![DOMElement::new("h1", None, vec![]).into()],
            )
            .into()],
        );
        assert_eq!(fragment(data).unwrap(), vec![DOMContent::Element(target)]);

        let data = r#"<html><h1>Hello, world</h1></html>"#;
        let target = DOMElement::new(
            "html",
            None,
            vec![DOMElement::new("h1", None, vec!["Hello, world".into()]).into()],
        );
        assert_eq!(fragment(data).unwrap(), vec![DOMContent::Element(target)]);
    }

    #[test]
    fn test_parse_malformed() {
        let err = fragment(r#"<html></closing><opening></html>"#).unwrap_err();
        assert_eq!(err.offset, 6);
        let err = fragment(r#"<---></--->"#).unwrap_err();
        assert_eq!(err.snippet, "</--->");
    }

    #[test]
    fn test_tag_parse() {
        let data = r#"<div>"#;
        let target = DOMElement::new("div", None, vec![]);
        assert_eq!(parse_open_tag(data).unwrap(), ("", target));

        let data = r#"<DIV class=nothing>"#;
        let target = DOMElement::new("div", Some(attributes!(class=>"nothing")), vec![]);
        assert_eq!(parse_open_tag(data).unwrap(), ("", target));

        let data = r#"<div attr1 attr2=two attr3='three' attr4="number four" href="a/b>c">"#;
        let target = DOMElement::new(
            "div",
            Some(DOMAttributes(vec![
                ("attr1".to_string(), "".to_string()),
                ("attr2".to_string(), "two".to_string()),
                ("attr3".to_string(), "three".to_string()),
                ("attr4".to_string(), "number four".to_string()),
                ("href".to_string(), "a/b>c".to_string()),
            ])),
            vec![],
        );
        assert_eq!(parse_open_tag(data).unwrap(), ("", target));
    }

    #[test]
    fn test_self_closing_and_void() {
        let contents = fragment(r#"<br />a<img src="x.png">b"#).unwrap();
        assert_eq!(contents.len(), 4);
        let DOMContent::Element(br) = &contents[0] else {
            panic!("expected <br>");
        };
        assert!(br.self_closing);
        let DOMContent::Element(img) = &contents[2] else {
            panic!("expected <img>");
        };
        assert!(!img.self_closing);
        assert_eq!(img.get_attribute("src").map(String::as_str), Some("x.png"));
    }

    #[test]
    fn test_raw_text() {
        let contents = fragment("<script>if (a < b) { x(); }</script>").unwrap();
        let DOMContent::Element(script) = &contents[0] else {
            panic!("expected <script>");
        };
        assert_eq!(
            script.contents,
            vec![DOMContent::Text("if (a < b) { x(); }".to_string())]
        );

        // No closing tag: the opening tag is text and the body is parsed as usual
        let contents = fragment("<style>p<b>x</b>").unwrap();
        assert_eq!(contents[0], DOMContent::Text("<style>p".to_string()));
        assert!(matches!(&contents[1], DOMContent::Element(b) if b.name == "b"));
    }

    #[test]
    fn test_entities_stay_escaped() {
        let contents = fragment("<h2>&lt;code&gt;foo&lt;/code&gt;</h2>").unwrap();
        let DOMContent::Element(h2) = &contents[0] else {
            panic!("expected <h2>");
        };
        assert_eq!(
            h2.contents,
            vec![DOMContent::Text("&lt;code&gt;foo&lt;/code&gt;".to_string())]
        );
    }

    #[test]
    fn test_stray_open_bracket_is_text() {
        let contents = fragment("a < b <c").unwrap();
        assert_eq!(contents, vec![DOMContent::Text("a < b <c".to_string())]);
    }

    #[test]
    fn test_fragment_rejects_unmatched_close() {
        let err = fragment("<code>a</code>b</em>").unwrap_err();
        assert_eq!(err.offset, 15);
        assert_eq!(err.snippet, "</em>");
    }

    #[test]
    fn test_unclosed_become_text() {
        let contents = fragment("<b>x<i>y</b>z").unwrap();
        assert_eq!(
            contents,
            vec![
                DOMContent::Element(DOMElement::new("b", None, vec!["x<i>y".into()])),
                DOMContent::Text("z".to_string()),
            ]
        );

        let contents = fragment("<p class=a>one<p>two").unwrap();
        assert_eq!(contents, vec![DOMContent::Text("<p class=a>one<p>two".to_string())]);
    }

    #[test]
    fn test_many_unclosed_tags() {
        let markup = "<p>x".repeat(500);
        let contents = fragment(&markup).unwrap();
        assert_eq!(contents, vec![DOMContent::Text(markup.clone())]);

        let closed = format!("<div>{}</div>", markup);
        let contents = fragment(&closed).unwrap();
        assert_eq!(
            contents,
            vec![DOMContent::Element(DOMElement::new(
                "div",
                None,
                vec![DOMContent::Text(markup)]
            ))]
        );
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 20_000;
        let markup = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let contents = fragment(&markup).unwrap();
        let mut levels = 0;
        let mut current = &contents;
        while let Some(DOMContent::Element(e)) = current.first() {
            levels += 1;
            current = &e.contents;
        }
        assert_eq!(levels, depth);
        assert_eq!(current, &vec![DOMContent::Text("x".to_string())]);
    }

    #[test]
    fn test_document() {
        let i = r#"<!DOCTYPE html>
<html lang="en">
<!-- User-visible content goes in the body -->
<body><p>Some paragraph</p></body>
</html>
"#;
        let doc = parse_document(i).unwrap();
        assert_eq!(doc.doctype(), Some("html"));
        assert_eq!(doc.contents.len(), 4);
        assert_eq!(doc.contents[0], DOMContent::Doctype("DOCTYPE html".to_string()));
        let DOMContent::Element(html) = &doc.contents[2] else {
            panic!("expected <html>");
        };
        assert_eq!(html.get_attribute("lang").map(String::as_str), Some("en"));
        assert!(matches!(html.contents[1], DOMContent::Comment(_)));
    }

    #[test]
    fn test_doctype_as_written() {
        let doc = parse_document("\n  <!doctype html><p></p>").unwrap();
        assert_eq!(doc.contents[0], DOMContent::Text("\n  ".to_string()));
        assert_eq!(doc.contents[1], DOMContent::Doctype("doctype html".to_string()));
        assert_eq!(doc.doctype(), Some("html"));
    }
}
