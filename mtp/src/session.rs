// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * The MTP session: transaction sequencing and the typed operation set.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::io::{Read, Write};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};

use crate::codec::{Reader, Writer};
use crate::code::{OperationCode, ResponseCode};
use crate::container::{Container, ContainerType};
use crate::datatype::Value;
use crate::error::{Error, ProtocolError, Result};
use crate::format::{AssociationType, ObjectFormat};
use crate::message::{
    DeviceInfo, NewObjectInfo, ObjectHandles, ObjectInfo, ObjectPropertiesSupported, PropertyDesc,
    StorageIds, StorageInfo,
};
use crate::pipe::{Event, Pipe};
use crate::property::{DeviceProperty, ObjectProperty};
use crate::proplist;
use crate::transport::{EndpointConfig, UsbTransport};
use crate::types::{ObjectId, StorageId, TransactionId, STORAGE_ALL};

/// Default per-transfer timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Conventional session id for the single session MTP devices allow.
pub const DEFAULT_SESSION_ID: u32 = 1;

/// An MTP session over one claimed USB interface.
///
/// Owns the transaction counter (strictly monotonic from zero), the cached
/// [`DeviceInfo`], and — after an MTPZ handshake — the secure-session state.
/// All operations take `&mut self`: a session carries at most one
/// outstanding transaction, and callers on multiple threads must serialize
/// behind their own lock.
#[derive(Debug)]
pub struct Session<T: UsbTransport> {
    pipe: Pipe<T>,
    next_transaction: u32,
    open: bool,
    device_info: Option<DeviceInfo>,
    timeout: Duration,
    session_key: Option<[u8; 16]>,
}

impl<T: UsbTransport> Session<T> {
    /// Creates a session over a claimed interface. No traffic is issued
    /// until the first operation.
    pub fn new(transport: T, config: EndpointConfig) -> Self {
        Self {
            pipe: Pipe::new(transport, config),
            next_transaction: 0,
            open: false,
            device_info: None,
            timeout: DEFAULT_TIMEOUT,
            session_key: None,
        }
    }

    /// Overrides the per-transfer timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The transaction id the next operation will use.
    pub fn next_transaction_id(&self) -> TransactionId {
        TransactionId(self.next_transaction)
    }

    /// Whether an MTPZ handshake has completed on this session.
    pub fn is_secure(&self) -> bool {
        self.session_key.is_some()
    }

    /// The MTPZ session key, once the handshake stored it.
    pub fn session_key(&self) -> Option<&[u8; 16]> {
        self.session_key.as_ref()
    }

    /// Stores the MTPZ session key and marks the session secure.
    ///
    /// Written once by `TrustedApp::authenticate`, read thereafter.
    pub fn enable_secure_session(&mut self, key: [u8; 16]) {
        self.session_key = Some(key);
    }

    fn allocate_transaction(&mut self) -> TransactionId {
        let id = TransactionId(self.next_transaction);
        self.next_transaction = self.next_transaction.wrapping_add(1);
        id
    }

    fn check_response(&self, container: &Container, transaction: TransactionId) -> Result<Vec<u32>> {
        if container.header.transaction != transaction {
            return Err(ProtocolError::TransactionIdMismatch {
                expected: transaction,
                actual: container.header.transaction,
            }
            .into());
        }
        if container.header.kind != ContainerType::Response {
            return Err(ProtocolError::UnexpectedContainer {
                expected: ContainerType::Response,
                actual: container.header.kind,
            }
            .into());
        }
        let code = ResponseCode(container.header.code);
        let params = container.params();
        if !code.is_ok() {
            debug!("response {code} to tid {transaction}");
            return Err(Error::response(code, params));
        }
        Ok(params)
    }

    fn check_data(
        &self,
        container: &Container,
        code: OperationCode,
        transaction: TransactionId,
    ) -> Result<()> {
        if container.header.transaction != transaction {
            return Err(ProtocolError::TransactionIdMismatch {
                expected: transaction,
                actual: container.header.transaction,
            }
            .into());
        }
        if container.header.code != code.0 {
            return Err(ProtocolError::UnexpectedCode {
                expected: code.0,
                actual: container.header.code,
            }
            .into());
        }
        Ok(())
    }

    /// One full transaction: Command, optional outbound Data, then either
    /// an inbound Data followed by a Response, or a bare Response.
    ///
    /// Returns the response parameters and the inbound payload, if any.
    fn request(
        &mut self,
        code: OperationCode,
        params: &[u32],
        data_out: Option<&[u8]>,
    ) -> Result<(Vec<u32>, Option<Bytes>)> {
        let tid = self.allocate_transaction();
        self.pipe.send_command(code, params, tid, self.timeout)?;
        if let Some(data) = data_out {
            self.pipe.send_data(code, tid, data, self.timeout)?;
        }

        let first = self.pipe.recv(self.timeout)?;
        match first.header.kind {
            ContainerType::Data => {
                self.check_data(&first, code, tid)?;
                let payload = first.payload;
                let response = self.pipe.recv(self.timeout)?;
                let params = self.check_response(&response, tid)?;
                Ok((params, Some(payload)))
            }
            _ => {
                let params = self.check_response(&first, tid)?;
                Ok((params, None))
            }
        }
    }

    /// A transaction whose inbound Data phase streams into `sink`.
    fn request_to_sink(
        &mut self,
        code: OperationCode,
        params: &[u32],
        sink: &mut dyn Write,
    ) -> Result<()> {
        let tid = self.allocate_transaction();
        self.pipe.send_command(code, params, tid, self.timeout)?;
        let first = self.pipe.recv_to_sink(sink, self.timeout)?;
        match first.header.kind {
            ContainerType::Data => {
                self.check_data(&first, code, tid)?;
                let response = self.pipe.recv(self.timeout)?;
                self.check_response(&response, tid)?;
                Ok(())
            }
            _ => {
                self.check_response(&first, tid)?;
                Ok(())
            }
        }
    }

    fn request_expect_data(
        &mut self,
        code: OperationCode,
        params: &[u32],
    ) -> Result<Bytes> {
        let (_, data) = self.request(code, params, None)?;
        data.ok_or_else(|| ProtocolError::ShortResponse.into())
    }

    // Session control -----------------------------------------------------

    /// Opens the session under `session_id`; devices conventionally expect
    /// [`DEFAULT_SESSION_ID`].
    pub fn open_session(&mut self, session_id: u32) -> Result<()> {
        self.request(OperationCode::OPEN_SESSION, &[session_id], None)?;
        self.open = true;
        debug!("session {session_id} open");
        Ok(())
    }

    /// Closes the session.
    pub fn close_session(&mut self) -> Result<()> {
        self.request(OperationCode::CLOSE_SESSION, &[], None)?;
        self.open = false;
        Ok(())
    }

    /// Cancels the outstanding transfer (class Cancel Request), then
    /// clears the bulk pipes.
    pub fn abort_current_transaction(&mut self) -> Result<()> {
        let current = TransactionId(self.next_transaction.wrapping_sub(1));
        self.pipe.cancel(current, self.timeout)
    }

    /// Polls the interrupt pipe for one device event.
    pub fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        self.pipe.poll_event(timeout)
    }

    // Device information --------------------------------------------------

    /// Fetches (and caches) the device description.
    pub fn get_device_info(&mut self) -> Result<&DeviceInfo> {
        if self.device_info.is_none() {
            let data = self.request_expect_data(OperationCode::GET_DEVICE_INFO, &[])?;
            let info = DeviceInfo::decode(&mut Reader::new(&data)).map_err(Error::from)?;
            trace!(
                "device: {} {} ({})",
                info.manufacturer,
                info.model,
                info.serial_number
            );
            self.device_info = Some(info);
        }
        Ok(self.device_info.as_ref().unwrap())
    }

    /// The cached device description, when already fetched.
    pub fn cached_device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    // Storage -------------------------------------------------------------

    /// Lists storage ids, in device order.
    pub fn get_storage_ids(&mut self) -> Result<StorageIds> {
        let data = self.request_expect_data(OperationCode::GET_STORAGE_IDS, &[])?;
        Ok(StorageIds::decode(&mut Reader::new(&data))?)
    }

    /// Describes one storage.
    pub fn get_storage_info(&mut self, storage: StorageId) -> Result<StorageInfo> {
        let data = self.request_expect_data(OperationCode::GET_STORAGE_INFO, &[storage.0])?;
        Ok(StorageInfo::decode(&mut Reader::new(&data))?)
    }

    // Object enumeration --------------------------------------------------

    /// Counts objects below `parent`.
    pub fn get_num_objects(
        &mut self,
        storage: StorageId,
        format: ObjectFormat,
        parent: ObjectId,
    ) -> Result<u32> {
        let (params, _) = self.request(
            OperationCode::GET_NUM_OBJECTS,
            &[storage.0, format.0 as u32, parent.0],
            None,
        )?;
        params.first().copied().ok_or_else(|| ProtocolError::ShortResponse.into())
    }

    /// Lists object handles under `parent`, optionally filtered by format.
    ///
    /// With [`STORAGE_ALL`] the storages are enumerated one by one, in
    /// [`get_storage_ids`](Self::get_storage_ids) order, and the results
    /// concatenated.
    pub fn get_object_handles(
        &mut self,
        storage: StorageId,
        format: ObjectFormat,
        parent: ObjectId,
    ) -> Result<ObjectHandles> {
        if storage == STORAGE_ALL {
            let mut all = ObjectHandles::default();
            for id in self.get_storage_ids()?.ids {
                let mut handles = self.list_handles(id, format, parent)?;
                all.handles.append(&mut handles.handles);
            }
            return Ok(all);
        }
        self.list_handles(storage, format, parent)
    }

    fn list_handles(
        &mut self,
        storage: StorageId,
        format: ObjectFormat,
        parent: ObjectId,
    ) -> Result<ObjectHandles> {
        let data = self.request_expect_data(
            OperationCode::GET_OBJECT_HANDLES,
            &[storage.0, format.0 as u32, parent.0],
        )?;
        Ok(ObjectHandles::decode(&mut Reader::new(&data))?)
    }

    /// Describes one object.
    pub fn get_object_info(&mut self, object: ObjectId) -> Result<ObjectInfo> {
        let data = self.request_expect_data(OperationCode::GET_OBJECT_INFO, &[object.0])?;
        Ok(ObjectInfo::decode(&mut Reader::new(&data))?)
    }

    /// The parent of an object, from its description.
    pub fn get_object_parent(&mut self, object: ObjectId) -> Result<ObjectId> {
        Ok(self.get_object_info(object)?.parent)
    }

    // Object transfer -----------------------------------------------------

    /// Downloads an object into `sink`.
    pub fn get_object(&mut self, object: ObjectId, sink: &mut dyn Write) -> Result<()> {
        self.request_to_sink(OperationCode::GET_OBJECT, &[object.0], sink)
    }

    /// Downloads `length` bytes of an object starting at `offset`.
    pub fn get_partial_object(
        &mut self,
        object: ObjectId,
        offset: u32,
        length: u32,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.request_to_sink(
            OperationCode::GET_PARTIAL_OBJECT,
            &[object.0, offset, length],
            sink,
        )
    }

    /// Downloads an object's thumbnail.
    pub fn get_thumb(&mut self, object: ObjectId, sink: &mut dyn Write) -> Result<()> {
        self.request_to_sink(OperationCode::GET_THUMB, &[object.0], sink)
    }

    /// Announces an upcoming object. The device answers with the storage,
    /// parent and handle it reserved; the very next command must be
    /// [`send_object`](Self::send_object) or the device drops the
    /// reservation with `NoValidObjectInfo`.
    pub fn send_object_info(
        &mut self,
        storage: StorageId,
        parent: ObjectId,
        info: &ObjectInfo,
    ) -> Result<NewObjectInfo> {
        let mut w = Writer::new();
        info.encode(&mut w).map_err(Error::from)?;
        let (params, _) = self.request(
            OperationCode::SEND_OBJECT_INFO,
            &[storage.0, parent.0],
            Some(&w.into_vec()),
        )?;
        new_object_from_params(&params)
    }

    /// Sends the object body announced by the preceding
    /// [`send_object_info`](Self::send_object_info) or
    /// [`send_object_prop_list`](Self::send_object_prop_list).
    pub fn send_object(&mut self, source: &mut dyn Read, size: u64) -> Result<()> {
        let tid = self.allocate_transaction();
        self.pipe
            .send_command(OperationCode::SEND_OBJECT, &[], tid, self.timeout)?;
        self.pipe
            .send_data_from(OperationCode::SEND_OBJECT, tid, source, size, self.timeout)?;
        let response = self.pipe.recv(self.timeout)?;
        self.check_response(&response, tid)?;
        Ok(())
    }

    /// Deletes an object.
    pub fn delete_object(&mut self, object: ObjectId) -> Result<()> {
        self.request(OperationCode::DELETE_OBJECT, &[object.0], None)?;
        Ok(())
    }

    /// Sets or clears the object protection status.
    pub fn set_object_protection(&mut self, object: ObjectId, protected: bool) -> Result<()> {
        self.request(
            OperationCode::SET_OBJECT_PROTECTION,
            &[object.0, protected as u32],
            None,
        )?;
        Ok(())
    }

    /// Creates a directory (an Association object) under `parent`.
    pub fn create_directory(
        &mut self,
        name: &str,
        parent: ObjectId,
        storage: StorageId,
    ) -> Result<NewObjectInfo> {
        let info = ObjectInfo {
            storage,
            format: ObjectFormat::ASSOCIATION,
            association_type: AssociationType::GENERIC_FOLDER,
            parent,
            filename: name.to_string(),
            ..ObjectInfo::default()
        };
        let created = self.send_object_info(storage, parent, &info)?;
        // An association has no body, but the info/object pairing still
        // applies.
        self.send_object(&mut std::io::empty(), 0)?;
        Ok(created)
    }

    /// Uploads a file under `parent`, replacing any existing child with the
    /// same name. A failed delete of the previous object aborts the upload.
    pub fn put_object(
        &mut self,
        storage: StorageId,
        parent: ObjectId,
        info: &ObjectInfo,
        source: &mut dyn Read,
        size: u64,
    ) -> Result<NewObjectInfo> {
        let existing = self.get_object_handles(storage, ObjectFormat::ANY, parent)?;
        for candidate in existing.handles {
            let name =
                self.get_object_string_property(candidate, ObjectProperty::OBJECT_FILENAME)?;
            if name == info.filename {
                debug!("replacing existing object {candidate} ({name})");
                self.delete_object(candidate)?;
                break;
            }
        }
        let created = self.send_object_info(storage, parent, info)?;
        self.send_object(source, size)?;
        Ok(created)
    }

    // Object properties ---------------------------------------------------

    /// Property codes supported for an object format.
    pub fn get_object_properties_supported(
        &mut self,
        format: ObjectFormat,
    ) -> Result<ObjectPropertiesSupported> {
        let data = self.request_expect_data(
            OperationCode::GET_OBJECT_PROPS_SUPPORTED,
            &[format.0 as u32],
        )?;
        Ok(ObjectPropertiesSupported::decode(&mut Reader::new(&data))?)
    }

    /// Describes one property of an object format.
    pub fn get_object_property_desc(
        &mut self,
        property: ObjectProperty,
        format: ObjectFormat,
    ) -> Result<PropertyDesc> {
        let data = self.request_expect_data(
            OperationCode::GET_OBJECT_PROP_DESC,
            &[property.0 as u32, format.0 as u32],
        )?;
        Ok(PropertyDesc::decode(&mut Reader::new(&data))?)
    }

    /// Raw value of one object property.
    pub fn get_object_property(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
    ) -> Result<Bytes> {
        self.request_expect_data(
            OperationCode::GET_OBJECT_PROP_VALUE,
            &[object.0, property.0 as u32],
        )
    }

    /// String value of one object property.
    pub fn get_object_string_property(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
    ) -> Result<String> {
        let data = self.get_object_property(object, property)?;
        Ok(Reader::new(&data).read_string().map_err(Error::from)?)
    }

    /// Integer value of one object property, widened to `u64`.
    pub fn get_object_integer_property(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
    ) -> Result<u64> {
        let data = self.get_object_property(object, property)?;
        let mut r = Reader::new(&data);
        let value = match data.len() {
            1 => r.read_u8()? as u64,
            2 => r.read_u16()? as u64,
            4 => r.read_u32()? as u64,
            8 => r.read_u64()?,
            _ => return Err(ProtocolError::ShortResponse.into()),
        };
        Ok(value)
    }

    /// Writes one object property.
    pub fn set_object_property(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
        value: &Value,
    ) -> Result<()> {
        let mut w = Writer::new();
        value.encode(&mut w).map_err(Error::from)?;
        self.request(
            OperationCode::SET_OBJECT_PROP_VALUE,
            &[object.0, property.0 as u32],
            Some(&w.into_vec()),
        )?;
        Ok(())
    }

    /// Writes one object property as a `u8` array (cover art and friends).
    pub fn set_object_property_as_array(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
        data: &[u8],
    ) -> Result<()> {
        let mut w = Writer::new();
        w.write_u32(data.len() as u32);
        w.write_bytes(data);
        self.request(
            OperationCode::SET_OBJECT_PROP_VALUE,
            &[object.0, property.0 as u32],
            Some(&w.into_vec()),
        )?;
        Ok(())
    }

    /// Fetches an encoded property list (see [`proplist`]).
    ///
    /// `depth` 1 lists direct children; `property` may be
    /// [`ObjectProperty::ALL`]. When the device reports properties outside a
    /// specific filter they are kept and flagged through `log::warn!`.
    pub fn get_object_property_list(
        &mut self,
        parent: ObjectId,
        format: ObjectFormat,
        property: ObjectProperty,
        group_code: u32,
        depth: u32,
    ) -> Result<Bytes> {
        let data = self.request_expect_data(
            OperationCode::GET_OBJECT_PROP_LIST,
            &[
                parent.0,
                format.0 as u32,
                property.0 as u32,
                group_code,
                depth,
            ],
        )?;
        if property != ObjectProperty::ALL {
            // Surface stray entries without dropping them: the buffer is
            // handed to the caller as-is.
            proplist::parse_with(&data, proplist::skip_value, |object, reported, ()| {
                if reported != property {
                    warn!(
                        "device reported extra property {reported} on {object} (asked for {property})"
                    );
                }
            })
            .map_err(Error::from)?;
        }
        Ok(data)
    }

    /// Creates an object from a property list. The object body must follow
    /// via [`send_object`](Self::send_object).
    pub fn send_object_prop_list(
        &mut self,
        storage: StorageId,
        parent: ObjectId,
        format: ObjectFormat,
        size: u64,
        proplist: &[u8],
    ) -> Result<NewObjectInfo> {
        let (params, _) = self.request(
            OperationCode::SEND_OBJECT_PROP_LIST,
            &[
                storage.0,
                parent.0,
                format.0 as u32,
                (size >> 32) as u32,
                size as u32,
            ],
            Some(proplist),
        )?;
        new_object_from_params(&params)
    }

    // Object references ---------------------------------------------------

    /// Objects referenced by `object` (e.g. the tracks of an album).
    pub fn get_object_references(&mut self, object: ObjectId) -> Result<Vec<ObjectId>> {
        let data =
            self.request_expect_data(OperationCode::GET_OBJECT_REFERENCES, &[object.0])?;
        Ok(ObjectHandles::decode(&mut Reader::new(&data))?.handles)
    }

    /// Replaces the reference list of `object`.
    pub fn set_object_references(
        &mut self,
        object: ObjectId,
        references: &[ObjectId],
    ) -> Result<()> {
        let mut w = Writer::new();
        w.write_array_with(references, |w, id| w.write_u32(id.0));
        self.request(
            OperationCode::SET_OBJECT_REFERENCES,
            &[object.0],
            Some(&w.into_vec()),
        )?;
        Ok(())
    }

    // Device properties ---------------------------------------------------

    /// Raw value of a device property.
    pub fn get_device_property(&mut self, property: DeviceProperty) -> Result<Bytes> {
        self.request_expect_data(OperationCode::GET_DEVICE_PROP_VALUE, &[property.0 as u32])
    }

    /// String value of a device property.
    pub fn get_device_string_property(&mut self, property: DeviceProperty) -> Result<String> {
        let data = self.get_device_property(property)?;
        Ok(Reader::new(&data).read_string().map_err(Error::from)?)
    }

    /// Writes a raw, pre-encoded device property value.
    pub fn set_device_property(&mut self, property: DeviceProperty, value: &[u8]) -> Result<()> {
        self.request(
            OperationCode::SET_DEVICE_PROP_VALUE,
            &[property.0 as u32],
            Some(value),
        )?;
        Ok(())
    }

    /// Resets a device property to its factory default.
    pub fn reset_device_property(&mut self, property: DeviceProperty) -> Result<()> {
        self.request(
            OperationCode::RESET_DEVICE_PROP_VALUE,
            &[property.0 as u32],
            None,
        )?;
        Ok(())
    }

    /// Issues a raw vendor operation with an outbound data phase.
    ///
    /// Used by the MTPZ handshake and the Zune metadata flow; returns the
    /// inbound payload when the device sends one.
    pub fn vendor_request(
        &mut self,
        code: OperationCode,
        params: &[u32],
        data_out: Option<&[u8]>,
    ) -> Result<Option<Bytes>> {
        let (_, data) = self.request(code, params, data_out)?;
        Ok(data)
    }
}

fn new_object_from_params(params: &[u32]) -> Result<NewObjectInfo> {
    if params.len() < 3 {
        return Err(ProtocolError::ShortResponse.into());
    }
    Ok(NewObjectInfo {
        storage: StorageId(params[0]),
        parent: ObjectId(params[1]),
        object: ObjectId(params[2]),
    })
}

impl<T: UsbTransport> Drop for Session<T> {
    /// Best-effort CloseSession; transport and interface teardown follow in
    /// the backend's own drop order.
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.close_session() {
                debug!("close on drop failed: {e}");
            }
        }
    }
}
