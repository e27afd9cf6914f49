//! Slice extension writing for 3MF model files

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::format_f64;
use crate::error::{Error, ErrorCode, Result};
use crate::model::{Slice, SliceStack};

use super::PartWriter;

/// Write a slice stack
pub(super) fn write_slice_stack<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    stack: &SliceStack,
) -> Result<()> {
    let mut elem = BytesStart::new("s:slicestack");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("zbottom", format_f64(stack.zbottom).as_str()));
    out.start(elem)?;

    for slice in &stack.slices {
        write_slice(out, slice)?;
    }

    for slice_ref in &stack.slice_refs {
        let (stack_id, path) = out.reference(slice_ref.slice_stack)?;
        let Some(path) = path else {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!(
                    "slice reference to {} points back into its own part",
                    slice_ref.slice_stack
                ),
            ));
        };
        let mut ref_elem = BytesStart::new("s:sliceref");
        ref_elem.push_attribute(("slicestackid", stack_id.to_string().as_str()));
        ref_elem.push_attribute(("slicepath", path));
        out.empty(ref_elem)?;
    }

    out.end("s:slicestack")
}

fn write_slice<W: IoWrite>(out: &mut PartWriter<'_, W>, slice: &Slice) -> Result<()> {
    let mut elem = BytesStart::new("s:slice");
    elem.push_attribute(("ztop", format_f64(slice.ztop).as_str()));
    if slice.vertices.is_empty() && slice.polygons.is_empty() {
        return out.empty(elem);
    }
    out.start(elem)?;

    out.start(BytesStart::new("s:vertices"))?;
    for vertex in &slice.vertices {
        let mut v_elem = BytesStart::new("s:vertex");
        v_elem.push_attribute(("x", format_f64(vertex.x).as_str()));
        v_elem.push_attribute(("y", format_f64(vertex.y).as_str()));
        out.empty(v_elem)?;
    }
    out.end("s:vertices")?;

    for polygon in &slice.polygons {
        let mut p_elem = BytesStart::new("s:polygon");
        p_elem.push_attribute(("startv", polygon.start_vertex.to_string().as_str()));
        out.start(p_elem)?;
        for v2 in &polygon.segments {
            let mut s_elem = BytesStart::new("s:segment");
            s_elem.push_attribute(("v2", v2.to_string().as_str()));
            out.empty(s_elem)?;
        }
        out.end("s:polygon")?;
    }

    out.end("s:slice")
}
