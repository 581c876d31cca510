use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::combinator::map;
use nom::multi::fold_many0;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;

// Split a header line into its field name and the text after the colon.
// Whitespace between the name and the colon is tolerated.
pub(crate) fn header_field(line: &[u8]) -> IResult<&[u8], &[u8]> {
    let name = take_while1(|c: u8| c > b' ' && c < 127 && c != b':');
    terminated(name, pair(take_while(wsp), tag(b":")))(line)
}

// Parse an unfolded Content-Type value into type, subtype and parameters
pub(crate) fn content_type(buf: &[u8]) -> IResult<&[u8], (&[u8], &[u8], Vec<(Vec<u8>, Vec<u8>)>)> {
    let mime_type = separated_pair(token, delimited(space, tag(b"/"), space), token);
    let (i, (mtype, subtype)) = preceded(space, mime_type)(buf)?;
    let (i, params) = parameters(i)?;
    Ok((i, (mtype, subtype, params)))
}

fn parameters(buf: &[u8]) -> IResult<&[u8], Vec<(Vec<u8>, Vec<u8>)>> {
    fold_many0(parameter, Vec::new, |mut acc: Vec<_>, item| {
        acc.push(item);
        acc
    })(buf)
}

fn parameter(buf: &[u8]) -> IResult<&[u8], (Vec<u8>, Vec<u8>)> {
    let preamble = tuple((space, tag(b";"), space));
    let (i, attribute) = preceded(preamble, token)(buf)?;
    let (i, value) = preceded(tuple((space, tag(b"="), space)), parameter_value)(i)?;
    Ok((i, (attribute.to_vec(), value)))
}

fn parameter_value(buf: &[u8]) -> IResult<&[u8], Vec<u8>> {
    alt((quoted_string, map(bare_value, |b: &[u8]| b.to_vec())))(buf)
}

// Unquoted values are read up to the next separator. This is looser than an
// RFC 2045 token so that boundaries containing '=' or '/' still parse.
fn bare_value(buf: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|c: u8| !c.is_ascii_whitespace() && c != b';' && c != b'"')(buf)
}

fn token(buf: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|c: u8| c > b' ' && c < 127 && !tspecial(c))(buf)
}

fn quoted_string(buf: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let qs = preceded(tag(b"\""), in_quotes);
    terminated(qs, tag(b"\""))(buf)
}

fn in_quotes(buf: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut ret = Vec::new();
    let mut i = 0;
    while i < buf.len() && buf[i] != b'"' {
        if buf[i] == b'\\' && i + 1 < buf.len() {
            i += 1;
        }
        ret.push(buf[i]);
        i += 1;
    }
    Ok((&buf[i..], ret))
}

fn space(buf: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(|c: u8| c.is_ascii_whitespace())(buf)
}

fn wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

fn tspecial(c: u8) -> bool {
    c == b'('
        || c == b')'
        || c == b'<'
        || c == b'>'
        || c == b'@'
        || c == b','
        || c == b';'
        || c == b':'
        || c == b'\\'
        || c == b'"'
        || c == b'/'
        || c == b'['
        || c == b']'
        || c == b'?'
        || c == b'='
}
