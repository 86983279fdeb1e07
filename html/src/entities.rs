//! Character references as a browser re-serializes them.
//!
//! Text is decoded and escaped again the way `innerHTML` writes it: `&`, `<`,
//! `>` and no-break spaces come out as `&amp;`, `&lt;`, `&gt;` and `&nbsp;`,
//! everything else as the character itself. Named references outside the small
//! set below are kept as written, so they still decode to the same character.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char, digit1, hex_digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    sequence::{preceded, terminated, tuple},
    IResult,
};

fn to_char(code: u32) -> char {
    char::from_u32(code)
        .filter(|c| *c != '\0')
        .unwrap_or('\u{FFFD}')
}

/// `&#60;`, `&#x3C;`
fn numeric_reference(input: &str) -> IResult<&str, char> {
    let (rest, code) = preceded(
        tag("&#"),
        alt((
            preceded(
                one_of("xX"),
                map_res(hex_digit1, |h: &str| u32::from_str_radix(h, 16)),
            ),
            map_res(digit1, |d: &str| d.parse::<u32>()),
        )),
    )(input)?;
    let (rest, _) = opt(char(';'))(rest)?;
    Ok((rest, to_char(code)))
}

/// The references which may stand for markup characters
fn named_reference(input: &str) -> IResult<&str, char> {
    alt((
        map(terminated(tag("&apos"), char(';')), |_| '\''),
        map(terminated(alt((tag("&amp"), tag("&AMP"))), opt(char(';'))), |_| '&'),
        map(terminated(alt((tag("&lt"), tag("&LT"))), opt(char(';'))), |_| '<'),
        map(terminated(alt((tag("&gt"), tag("&GT"))), opt(char(';'))), |_| '>'),
        map(terminated(alt((tag("&quot"), tag("&QUOT"))), opt(char(';'))), |_| '"'),
        map(terminated(tag("&nbsp"), opt(char(';'))), |_| '\u{a0}'),
    ))(input)
}

/// Any other `&name;` or `&name`, left alone
fn other_reference(input: &str) -> IResult<&str, &str> {
    recognize(tuple((char('&'), alphanumeric1, opt(char(';')))))(input)
}

fn canonicalize(value: &str, escape: fn(char, &mut String)) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(c) = rest.chars().next() {
        if c == '&' {
            if let Ok((next, decoded)) = alt((numeric_reference, named_reference))(rest) {
                escape(decoded, &mut out);
                rest = next;
                continue;
            }
            if let Ok((next, raw)) = other_reference(rest) {
                out.push_str(raw);
                rest = next;
                continue;
            }
        }
        escape(c, &mut out);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn escape_text(c: char, out: &mut String) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '\u{a0}' => out.push_str("&nbsp;"),
        c => out.push(c),
    }
}

fn escape_attribute(c: char, out: &mut String) {
    match c {
        '&' => out.push_str("&amp;"),
        '"' => out.push_str("&quot;"),
        '\u{a0}' => out.push_str("&nbsp;"),
        c => out.push(c),
    }
}

/// Source text as it reads back from a parsed text node
pub fn canonical_text(text: &str) -> String {
    canonicalize(text, escape_text)
}

/// A source attribute value as it reads back inside double quotes
pub fn canonical_attribute(value: &str) -> String {
    canonicalize(value, escape_attribute)
}
