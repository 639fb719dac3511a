//! Just enough of the class file format to tell whether a class is deprecated.
//!
//! A class counts as deprecated if it carries the `Deprecated` attribute or a
//! `RuntimeVisibleAnnotations` entry for `java.lang.Deprecated`. Member-level
//! attributes are skipped.

use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;
const DEPRECATED_DESCRIPTOR: &str = "Ljava/lang/Deprecated;";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("not a class file")]
    BadMagic,
    #[error("class file truncated at byte {0}")]
    Truncated(usize),
    #[error("unknown constant pool tag {tag} at index {index}")]
    BadConstant { tag: u8, index: u16 },
}

pub fn is_deprecated(bytes: &[u8]) -> Result<bool, ClassFileError> {
    let mut r = Reader { bytes, pos: 0 };
    if r.u4()? != MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    r.skip(4)?;

    let utf8 = read_constant_pool(&mut r)?;

    // access_flags, this_class, super_class
    r.skip(6)?;
    let interfaces = r.u2()?;
    r.skip(usize::from(interfaces) * 2)?;
    skip_members(&mut r)?;
    skip_members(&mut r)?;

    let attributes = r.u2()?;
    for _ in 0..attributes {
        let name = r.u2()?;
        let len = r.u4()? as usize;
        let body = r.take(len)?;
        match lookup(&utf8, name) {
            Some("Deprecated") => return Ok(true),
            Some("RuntimeVisibleAnnotations") => {
                if annotations_mention(body, &utf8, DEPRECATED_DESCRIPTOR)? {
                    return Ok(true);
                }
            }
            _ => {}
        }
    }
    Ok(false)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated(self.pos))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.take(n).map(|_| ())
    }

    fn u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Returns the UTF-8 entries of the pool, indexed by constant pool index.
fn read_constant_pool<'a>(r: &mut Reader<'a>) -> Result<Vec<Option<&'a str>>, ClassFileError> {
    let count = r.u2()?;
    let mut utf8 = vec![None; usize::from(count)];
    let mut index = 1u16;
    while index < count {
        let tag = r.u1()?;
        match tag {
            1 => {
                let len = r.u2()?;
                let raw = r.take(usize::from(len))?;
                // Modified UTF-8; names we care about are plain ASCII.
                utf8[usize::from(index)] = std::str::from_utf8(raw).ok();
            }
            3 | 4 => r.skip(4)?,
            5 | 6 => {
                r.skip(8)?;
                index += 1;
            }
            7 | 8 | 16 | 19 | 20 => r.skip(2)?,
            9 | 10 | 11 | 12 | 17 | 18 => r.skip(4)?,
            15 => r.skip(3)?,
            _ => return Err(ClassFileError::BadConstant { tag, index }),
        }
        index += 1;
    }
    Ok(utf8)
}

fn lookup<'a>(utf8: &[Option<&'a str>], index: u16) -> Option<&'a str> {
    utf8.get(usize::from(index)).copied().flatten()
}

fn skip_members(r: &mut Reader<'_>) -> Result<(), ClassFileError> {
    let count = r.u2()?;
    for _ in 0..count {
        // access_flags, name_index, descriptor_index
        r.skip(6)?;
        let attributes = r.u2()?;
        for _ in 0..attributes {
            r.skip(2)?;
            let len = r.u4()? as usize;
            r.skip(len)?;
        }
    }
    Ok(())
}

fn annotations_mention(
    body: &[u8],
    utf8: &[Option<&str>],
    descriptor: &str,
) -> Result<bool, ClassFileError> {
    let mut r = Reader { bytes: body, pos: 0 };
    let count = r.u2()?;
    for _ in 0..count {
        if lookup(utf8, r.u2()?) == Some(descriptor) {
            return Ok(true);
        }
        skip_element_pairs(&mut r)?;
    }
    Ok(false)
}

fn skip_element_pairs(r: &mut Reader<'_>) -> Result<(), ClassFileError> {
    let pairs = r.u2()?;
    for _ in 0..pairs {
        r.skip(2)?;
        skip_element_value(r)?;
    }
    Ok(())
}

fn skip_element_value(r: &mut Reader<'_>) -> Result<(), ClassFileError> {
    match r.u1()? {
        b'e' => r.skip(4),
        b'@' => {
            r.skip(2)?;
            skip_element_pairs(r)
        }
        b'[' => {
            let n = r.u2()?;
            for _ in 0..n {
                skip_element_value(r)?;
            }
            Ok(())
        }
        // B C D F I J S Z s c
        _ => r.skip(2),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    enum Marker {
        None,
        Attribute,
        Annotation,
    }

    fn utf8(out: &mut Vec<u8>, s: &str) {
        out.push(1);
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    /// Minimal valid class file for `internal_name`. Its single field carries a
    /// `Deprecated` attribute that must not leak to the class.
    fn class_bytes(internal_name: &str, marker: Marker) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 52]);

        // #1 name, #2 Class#1, #3 Object, #4 Class#3, #5 Deprecated,
        // #6 RuntimeVisibleAnnotations, #7 descriptor, #8-9 Long, #10 "value", #11 "I"
        out.extend_from_slice(&12u16.to_be_bytes());
        utf8(&mut out, internal_name);
        out.extend_from_slice(&[7, 0, 1]);
        utf8(&mut out, "java/lang/Object");
        out.extend_from_slice(&[7, 0, 3]);
        utf8(&mut out, "Deprecated");
        utf8(&mut out, "RuntimeVisibleAnnotations");
        utf8(&mut out, DEPRECATED_DESCRIPTOR);
        out.push(5);
        out.extend_from_slice(&42u64.to_be_bytes());
        utf8(&mut out, "value");
        utf8(&mut out, "I");

        out.extend_from_slice(&[0x00, 0x21, 0, 2, 0, 4]);
        out.extend_from_slice(&[0, 0]);

        // one field carrying its own Deprecated attribute
        out.extend_from_slice(&[0, 1, 0, 0x02, 0, 10, 0, 11, 0, 1, 0, 5, 0, 0, 0, 0]);
        out.extend_from_slice(&[0, 0]);

        match marker {
            Marker::None => out.extend_from_slice(&[0, 0]),
            Marker::Attribute => out.extend_from_slice(&[0, 1, 0, 5, 0, 0, 0, 0]),
            Marker::Annotation => {
                // two annotations: type #11 with value=int const #8, then #7
                let body = [0, 2, 0, 11, 0, 1, 0, 10, b'I', 0, 8, 0, 7, 0, 0];
                out.extend_from_slice(&[0, 1, 0, 6]);
                out.extend_from_slice(&(body.len() as u32).to_be_bytes());
                out.extend_from_slice(&body);
            }
        }
        out
    }

    pub(crate) fn plain_class(internal_name: &str) -> Vec<u8> {
        class_bytes(internal_name, Marker::None)
    }

    pub(crate) fn deprecated_class(internal_name: &str) -> Vec<u8> {
        class_bytes(internal_name, Marker::Attribute)
    }

    #[test]
    fn detects_deprecated_attribute() {
        assert_eq!(is_deprecated(&deprecated_class("a/Old")), Ok(true));
    }

    #[test]
    fn detects_deprecated_annotation() {
        assert_eq!(
            is_deprecated(&class_bytes("a/Old", Marker::Annotation)),
            Ok(true)
        );
    }

    #[test]
    fn member_deprecation_does_not_mark_the_class() {
        assert_eq!(is_deprecated(&plain_class("a/Fresh")), Ok(false));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(is_deprecated(b""), Err(ClassFileError::Truncated(0)));
        assert_eq!(is_deprecated(b"PK\x03\x04"), Err(ClassFileError::BadMagic));

        let mut truncated = plain_class("a/Fresh");
        truncated.truncate(truncated.len() - 1);
        assert!(matches!(
            is_deprecated(&truncated),
            Err(ClassFileError::Truncated(_))
        ));
    }
}
