use std::{io, mem};

use bytes::{BufMut as _, Bytes, BytesMut};
use imap_proto::{RequestId, Response};
use tokio_util::codec::{Decoder, Encoder};

/// One server response together with the buffer it was parsed from.
#[derive(Debug)]
pub struct ResponseData {
    // Keeps the parse buffer alive for `response`.
    #[expect(dead_code)]
    raw: Bytes,
    response: Response<'static>,
}

impl ResponseData {
    pub fn parsed(&self) -> &Response<'_> {
        &self.response
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self.response {
            Response::Done { ref tag, .. } => Some(tag),
            _ => None,
        }
    }
}

/// A command line ready for the wire: tag plus command text or, with an
/// empty tag, continuation data.
pub struct Outgoing<'a> {
    pub tag: &'a [u8],
    pub data: &'a [u8],
}

#[derive(Default)]
pub struct ImapCodec {
    decode_need_message_bytes: usize,
}

impl Decoder for ImapCodec {
    type Item = ResponseData;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseData>, io::Error> {
        if self.decode_need_message_bytes > buf.len() {
            return Ok(None);
        }
        let (response, response_len) = match imap_proto::parser::parse_response(buf) {
            Ok((remaining, response)) => {
                // The buffer memory lives on the heap and is kept alive by
                // `raw` below, so extending the borrow to 'static is sound
                // as long as both stay in the same struct.
                let response =
                    unsafe { mem::transmute::<Response<'_>, Response<'static>>(response) };
                (response, buf.len() - remaining.len())
            }
            Err(nom::Err::Incomplete(nom::Needed::Size(min))) => {
                self.decode_need_message_bytes = min.get();
                return Ok(None);
            }
            Err(nom::Err::Incomplete(nom::Needed::Unknown)) => {
                return Ok(None);
            }
            Err(err) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unparseable response: {err:?}"),
                ));
            }
        };
        let raw = buf.split_to(response_len).freeze();
        self.decode_need_message_bytes = 0;
        Ok(Some(ResponseData { raw, response }))
    }
}

impl Encoder<Outgoing<'_>> for ImapCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Outgoing<'_>, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(item.tag.len() + item.data.len() + 3);
        if !item.tag.is_empty() {
            dst.put_slice(item.tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(item.data);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
