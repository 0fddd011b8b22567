//! Parser for the `--region PAGE:X,Y,WxH` argument.

use pdfredact::Rect;

/// Parse a region spec like `1:72,700,200x20` into a 1-based page number
/// and a page-space rectangle.
pub fn parse_region(input: &str) -> Result<(u32, Rect), String> {
    let (page_str, rect_str) = input
        .split_once(':')
        .ok_or_else(|| format!("invalid region '{input}': expected PAGE:X,Y,WxH"))?;

    let page: u32 = page_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number: '{page_str}'"))?;
    if page == 0 {
        return Err("page 0 is invalid (pages start at 1)".to_string());
    }

    let parts: Vec<&str> = rect_str.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!(
            "invalid region '{input}': expected X,Y,WxH after the page number"
        ));
    }
    let x = parse_coord(parts[0])?;
    let y = parse_coord(parts[1])?;

    let (w_str, h_str) = parts[2]
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{}': expected WxH", parts[2]))?;
    let width = parse_coord(w_str)?;
    let height = parse_coord(h_str)?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!(
            "invalid size '{}': width and height must be positive",
            parts[2]
        ));
    }

    Ok((page, Rect::new(x, y, width, height)))
}

fn parse_coord(s: &str) -> Result<f64, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("invalid number: '{s}'"))
}
