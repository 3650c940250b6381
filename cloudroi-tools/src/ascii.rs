//! Plain-text storage of organized clouds.
//!
//! The first non-comment line is the header `width height frame_id [sequence] [stamp_secs]`, followed by one
//! `x y z r g b` line per pixel in row-major order. Missing measurements are written as `nan`. Empty lines and lines
//! starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cloudroi_core::{
    cloud::{CloudHeader, ColoredPoint, ExtractedCloud, StructuredCloud},
    nalgebra::Vector3,
};

pub fn read_cloud_from_path<P: AsRef<Path>>(path: P) -> Result<StructuredCloud> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Could not open cloud file {}", path.display()))?;
    read_cloud(BufReader::new(file))
        .with_context(|| format!("Could not read cloud file {}", path.display()))
}

pub fn read_cloud<R: BufRead>(reader: R) -> Result<StructuredCloud> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(idx, line)| line.map(|l| (idx + 1, l)))
        .filter(|line| match line {
            Ok((_, l)) => {
                let trimmed = l.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            }
            Err(_) => true,
        });

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| anyhow!("Cloud file is empty"))??;
    let (width, height, header) = parse_header(&header_line)?;

    let mut points = Vec::with_capacity(width * height);
    for line in lines {
        let (line_number, line) = line?;
        if points.len() == width * height {
            bail!(
                "Line {}: more than {}x{} points",
                line_number,
                width,
                height
            );
        }
        points.push(
            parse_point(&line).with_context(|| format!("Line {}: invalid point", line_number))?,
        );
    }
    if points.len() != width * height {
        bail!(
            "Expected {}x{} points but found {}",
            width,
            height,
            points.len()
        );
    }
    Ok(StructuredCloud::new(width, height, points, header)?)
}

fn parse_header(line: &str) -> Result<(usize, usize, CloudHeader)> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 3 || tokens.len() > 5 {
        bail!(
            "Header must be 'width height frame_id [sequence] [stamp_secs]', got '{}'",
            line
        );
    }
    let width = tokens[0]
        .parse::<usize>()
        .with_context(|| format!("Invalid width '{}'", tokens[0]))?;
    let height = tokens[1]
        .parse::<usize>()
        .with_context(|| format!("Invalid height '{}'", tokens[1]))?;
    let sequence = match tokens.get(3) {
        Some(token) => token
            .parse::<u32>()
            .with_context(|| format!("Invalid sequence number '{}'", token))?,
        None => 0,
    };
    let stamp = match tokens.get(4) {
        Some(token) => {
            let secs = token
                .parse::<f64>()
                .with_context(|| format!("Invalid stamp '{}'", token))?;
            if !secs.is_finite() || secs < 0.0 {
                bail!("Stamp must be a non-negative number of seconds, got {}", secs);
            }
            Duration::from_secs_f64(secs)
        }
        None => Duration::ZERO,
    };
    Ok((width, height, CloudHeader::new(tokens[2], stamp, sequence)))
}

fn parse_value(token: &str) -> Result<f64> {
    if token.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    token
        .parse::<f64>()
        .with_context(|| format!("Invalid number '{}'", token))
}

fn parse_point(line: &str) -> Result<ColoredPoint> {
    let values = line
        .split_whitespace()
        .map(parse_value)
        .collect::<Result<Vec<_>>>()?;
    if values.len() != 6 {
        bail!("Expected 'x y z r g b' but found {} values", values.len());
    }
    Ok(ColoredPoint::new(
        Vector3::new(values[0], values[1], values[2]),
        Vector3::new(values[3] as f32, values[4] as f32, values[5] as f32),
    ))
}

fn write_header<W: Write>(
    writer: &mut W,
    width: usize,
    height: usize,
    header: &CloudHeader,
) -> Result<()> {
    writeln!(
        writer,
        "{} {} {} {} {}",
        width,
        height,
        header.frame_id,
        header.sequence,
        header.stamp.as_secs_f64()
    )?;
    Ok(())
}

fn write_point<W: Write>(writer: &mut W, point: &ColoredPoint) -> Result<()> {
    // `{}` prints NaN as `NaN`, which the reader accepts as well
    writeln!(
        writer,
        "{} {} {} {} {} {}",
        point.position.x,
        point.position.y,
        point.position.z,
        point.color.x,
        point.color.y,
        point.color.z
    )?;
    Ok(())
}

pub fn write_cloud<W: Write>(writer: W, cloud: &StructuredCloud) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    write_header(&mut writer, cloud.width(), cloud.height(), &cloud.header)?;
    for point in cloud.points() {
        write_point(&mut writer, point)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the points of `cloud` as a single row
pub fn write_extracted<W: Write>(writer: W, cloud: &ExtractedCloud) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    write_header(&mut writer, cloud.len(), 1, &cloud.header)?;
    for point in cloud.iter() {
        write_point(&mut writer, point)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_extracted_to_path<P: AsRef<Path>>(path: P, cloud: &ExtractedCloud) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Could not create output file {}", path.display()))?;
    write_extracted(file, cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};
    use std::io::Cursor;

    const SMALL_CLOUD: &str = "# recorded with a test camera
2 2 camera_rgb_optical_frame 12 3.5

0.0 0.0 1.0 1 0 0
1.0 0.0 1.0 0 1 0
nan nan nan 0 0 1
1.0 1.0 2.5 0.5 0.5 0.5
";

    #[test]
    fn reads_header_and_points() -> Result<()> {
        let cloud = read_cloud(Cursor::new(SMALL_CLOUD))?;
        assert_eq!(cloud.width(), 2);
        assert_eq!(cloud.height(), 2);
        assert_eq!(cloud.header.frame_id, "camera_rgb_optical_frame");
        assert_eq!(cloud.header.sequence, 12);
        assert_eq!(cloud.header.stamp, Duration::from_millis(3500));
        assert_eq!(cloud.valid_point_count(), 3);
        assert_eq!(
            cloud.at(1, 1).map(|p| p.position),
            Some(Vector3::new(1.0, 1.0, 2.5))
        );
        Ok(())
    }

    #[test]
    fn optional_header_fields_default_to_zero() -> Result<()> {
        let cloud = read_cloud(Cursor::new("2 1 camera\n0 0 0 0 0 0\n1 1 1 1 1 1\n"))?;
        assert_eq!(cloud.header.sequence, 0);
        assert_eq!(cloud.header.stamp, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn rejects_wrong_point_count() {
        assert!(read_cloud(Cursor::new("2 2 camera\n0 0 0 0 0 0\n")).is_err());
        assert!(read_cloud(Cursor::new("1 1 camera\n0 0 0 0 0 0\n1 1 1 1 1 1\n")).is_err());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(read_cloud(Cursor::new("")).is_err());
        assert!(read_cloud(Cursor::new("2 camera\n")).is_err());
        assert!(read_cloud(Cursor::new("1 1 camera\n0 0 0 0 0\n")).is_err());
        assert!(read_cloud(Cursor::new("1 1 camera\n0 0 zero 0 0 0\n")).is_err());
        assert!(read_cloud(Cursor::new("1 1 camera 0 -2\n0 0 0 0 0 0\n")).is_err());
    }

    #[test]
    fn written_cloud_reads_back() -> Result<()> {
        let mut rng = thread_rng();
        let points = (0..12)
            .map(|idx| {
                if idx == 5 {
                    ColoredPoint::invalid()
                } else {
                    ColoredPoint::new(
                        Vector3::new(rng.gen(), rng.gen(), rng.gen()),
                        Vector3::new(rng.gen(), rng.gen(), rng.gen()),
                    )
                }
            })
            .collect();
        let cloud = StructuredCloud::new(
            4,
            3,
            points,
            CloudHeader::new("camera", Duration::from_millis(250), 9),
        )?;

        let mut buffer = vec![];
        write_cloud(&mut buffer, &cloud)?;
        let read_back = read_cloud(Cursor::new(buffer))?;

        assert_eq!(read_back.header, cloud.header);
        assert_eq!(read_back.width(), 4);
        assert!(!read_back.points()[5].is_valid());
        for (expected, actual) in cloud.points().iter().zip(read_back.points().iter()) {
            if expected.is_valid() {
                assert_eq!(expected, actual);
            }
        }
        Ok(())
    }

    #[test]
    fn extracted_points_are_written_as_single_row() -> Result<()> {
        let mut extracted = ExtractedCloud::new(CloudHeader::new("base_link", Duration::ZERO, 1));
        extracted.points.push(ColoredPoint::new(
            Vector3::new(0.5, 0.25, 2.0),
            Vector3::new(1.0, 0.0, 0.0),
        ));
        extracted.points.push(ColoredPoint::new(
            Vector3::new(-0.5, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
        ));
        let mut buffer = vec![];
        write_extracted(&mut buffer, &extracted)?;
        let text = String::from_utf8(buffer)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("2 1 base_link 1 0"));
        assert_eq!(lines.next(), Some("0.5 0.25 2 1 0 0"));
        assert_eq!(lines.count(), 1);
        Ok(())
    }
}
