use super::{
    client_data_area::{clear_client_data_definition, create_client_data_area, define_client_data_area},
    SimObject, SimObjectBase,
};
use crate::{
    managed_data_object::{ManagedData, ManagedDataObject},
    shared::{ClientDataId, DefinitionId, RequestId, UpdateMode},
    simulation::{ClientDataPeriod, SharedHost, SimDataMessage},
};
use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
};
use tracing::{debug, error, trace, warn};
use uom::si::f64::*;

/// Where a buffered area is in receiving a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// No transfer was reserved. Chunks are ignored.
    Idle,
    Receiving,
    /// All expected bytes were received. Further chunks are ignored until the
    /// next reservation.
    Complete,
}

/// A client data area for content larger than a single message. The content is
/// transferred in chunks of `CHUNK_SIZE` bytes.
///
/// The content is kept as raw bytes rather than a typed element: chunk
/// boundaries are byte offsets and need not fall on element boundaries. Callers
/// interpret the bytes once the transfer is complete.
///
/// The receiver calls [`reserve`] with the size of the content before the first
/// chunk arrives. The change is signalled once, when the last chunk arrived.
/// Reserving zero bytes completes the transfer right away.
///
/// [`reserve`]: ClientDataBufferedAreaVariable::reserve
pub struct ClientDataBufferedAreaVariable<const CHUNK_SIZE: usize> {
    base: SimObjectBase,
    client_data_id: ClientDataId,
    content: RefCell<Vec<u8>>,
    expected_byte_count: Cell<usize>,
    received_bytes: Cell<usize>,
    received_chunks: Cell<usize>,
    state: Cell<StreamState>,
}
impl<const CHUNK_SIZE: usize> ClientDataBufferedAreaVariable<CHUNK_SIZE> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: SharedHost,
        name: &str,
        client_data_id: ClientDataId,
        definition_id: DefinitionId,
        request_id: RequestId,
        update_mode: UpdateMode,
        max_age_time: Time,
        max_age_ticks: u64,
    ) -> Self {
        define_client_data_area(&host, name, client_data_id, definition_id, CHUNK_SIZE);

        Self {
            base: SimObjectBase::new(
                host,
                name,
                definition_id,
                request_id,
                update_mode,
                max_age_time,
                max_age_ticks,
            ),
            client_data_id,
            content: RefCell::new(vec![]),
            expected_byte_count: Cell::new(0),
            received_bytes: Cell::new(0),
            received_chunks: Cell::new(0),
            state: Cell::new(StreamState::Idle),
        }
    }

    pub fn client_data_id(&self) -> ClientDataId {
        self.client_data_id
    }

    /// Creates the area in the simulator with the size of one chunk.
    pub fn allocate_client_data_area(&self, read_only_for_others: bool) -> bool {
        create_client_data_area(
            self.base.host(),
            self.name(),
            self.client_data_id,
            CHUNK_SIZE,
            read_only_for_others,
        )
    }

    /// Prepares for receiving a transfer of the given size, discarding whatever
    /// was received before.
    pub fn reserve(&self, expected_byte_count: usize) {
        self.managed().set_changed(false);

        {
            let mut content = self.content.borrow_mut();
            content.clear();
            content.reserve(expected_byte_count);
        }

        self.expected_byte_count.set(expected_byte_count);
        self.received_bytes.set(0);
        self.received_chunks.set(0);

        if expected_byte_count == 0 {
            self.state.set(StreamState::Complete);
            debug!(object = self.name(), "Reserved an empty transfer");
            self.managed().set_changed(true);
        } else {
            self.state.set(StreamState::Receiving);
        }
    }

    pub fn data(&self) -> Ref<'_, Vec<u8>> {
        self.content.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, Vec<u8>> {
        self.content.borrow_mut()
    }

    pub fn set_data(&self, data: Vec<u8>) {
        *self.content.borrow_mut() = data;
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    pub fn expected_byte_count(&self) -> usize {
        self.expected_byte_count.get()
    }

    pub fn received_bytes(&self) -> usize {
        self.received_bytes.get()
    }

    pub fn received_chunks(&self) -> usize {
        self.received_chunks.get()
    }

    pub fn request_periodic_data_from_sim(&self, period: ClientDataPeriod) -> bool {
        if self.is_auto_read() && period > ClientDataPeriod::Never {
            error!(object = self.name(), ?period, "Periodic request ignored as the data is read automatically");
            return false;
        }

        self.request(period)
    }

    fn request(&self, period: ClientDataPeriod) -> bool {
        match self.base.host().request_client_data(
            self.client_data_id,
            self.base.request_id(),
            self.base.definition_id(),
            period,
        ) {
            Ok(()) => true,
            Err(err) => {
                error!(object = self.name(), ?period, %err, "Failed to request client data");
                false
            }
        }
    }
}
impl<const CHUNK_SIZE: usize> ManagedData for ClientDataBufferedAreaVariable<CHUNK_SIZE> {
    fn managed(&self) -> &ManagedDataObject {
        self.base.managed()
    }
}
impl<const CHUNK_SIZE: usize> SimObject for ClientDataBufferedAreaVariable<CHUNK_SIZE> {
    fn base(&self) -> &SimObjectBase {
        &self.base
    }

    fn request_data_from_sim(&self) -> bool {
        self.request(ClientDataPeriod::Once)
    }

    fn process_sim_data(&self, message: &SimDataMessage, time: Time, tick: u64) {
        assert_eq!(
            message.request_id,
            self.base.request_id(),
            "Data of request {} was passed to {}",
            message.request_id,
            self.name()
        );

        match self.state.get() {
            StreamState::Receiving => {}
            state => {
                warn!(object = self.name(), ?state, "Ignoring chunk received outside of a reserved transfer");
                return;
            }
        }

        let remaining = self.expected_byte_count.get() - self.received_bytes.get();
        let length = remaining.min(CHUNK_SIZE).min(message.data.len());
        if length < remaining.min(CHUNK_SIZE) {
            trace!(
                object = self.name(),
                bytes = message.data.len(),
                "Received a chunk shorter than the chunk size"
            );
        }

        self.content
            .borrow_mut()
            .extend_from_slice(&message.data[..length]);
        self.received_bytes.set(self.received_bytes.get() + length);
        self.received_chunks.set(self.received_chunks.get() + 1);
        trace!(
            object = self.name(),
            received = self.received_bytes.get(),
            expected = self.expected_byte_count.get(),
            "Received chunk"
        );

        if self.received_bytes.get() >= self.expected_byte_count.get() {
            self.state.set(StreamState::Complete);
            debug!(
                object = self.name(),
                bytes = self.received_bytes.get(),
                chunks = self.received_chunks.get(),
                "Transfer complete"
            );
            self.managed().update_stamps(time, tick);
            self.managed().set_changed(true);
        }
    }

    /// Sends the content in chunks. The last chunk is padded with zeros. Stops at
    /// the first chunk the simulator does not accept.
    fn write_data_to_sim(&self) -> bool {
        let content = self.content.borrow().clone();
        for (index, chunk) in content.chunks(CHUNK_SIZE).enumerate() {
            let mut buffer = [0u8; CHUNK_SIZE];
            buffer[..chunk.len()].copy_from_slice(chunk);

            if let Err(err) = self.base.host().set_client_data(
                self.client_data_id,
                self.base.definition_id(),
                &buffer,
            ) {
                error!(object = self.name(), chunk = index, %err, "Failed to write chunk of client data");
                return false;
            }
        }

        true
    }
}
impl<const CHUNK_SIZE: usize> Drop for ClientDataBufferedAreaVariable<CHUNK_SIZE> {
    fn drop(&mut self) {
        clear_client_data_definition(self.base.host(), self.base.managed().name(), self.base.definition_id());
    }
}
impl<const CHUNK_SIZE: usize> fmt::Display for ClientDataBufferedAreaVariable<CHUNK_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (client data {}, chunk size {}, {:?}, {}/{} bytes in {} chunks)",
            self.managed(),
            self.client_data_id,
            CHUNK_SIZE,
            self.state.get(),
            self.received_bytes.get(),
            self.expected_byte_count.get(),
            self.received_chunks.get()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::test::{capture_logs, TestSimulatorHost};
    use rand::RngCore;
    use std::rc::Rc;
    use uom::si::time::second;

    const CLIENT_DATA_ID: ClientDataId = 1;
    const DEFINITION_ID: DefinitionId = 1;
    const REQUEST_ID: RequestId = 1;

    fn seconds(value: f64) -> Time {
        Time::new::<second>(value)
    }

    fn area<const CHUNK_SIZE: usize>(
        host: &Rc<TestSimulatorHost>,
    ) -> ClientDataBufferedAreaVariable<CHUNK_SIZE> {
        ClientDataBufferedAreaVariable::new(
            host.clone(),
            "A32NX_EFB_CHECKLISTS",
            CLIENT_DATA_ID,
            DEFINITION_ID,
            REQUEST_ID,
            UpdateMode::NO_AUTO_UPDATE,
            seconds(0.),
            0,
        )
    }

    fn chunk(data: &[u8]) -> SimDataMessage {
        SimDataMessage {
            request_id: REQUEST_ID,
            define_count: 1,
            data: data.to_vec(),
        }
    }

    fn counting_changes<const CHUNK_SIZE: usize>(
        area: &ClientDataBufferedAreaVariable<CHUNK_SIZE>,
    ) -> Rc<Cell<usize>> {
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        area.add_callback(Rc::new(move || counter.set(counter.get() + 1)));
        changes
    }

    #[test]
    fn chunks_are_reassembled_and_signalled_once() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        let changes = counting_changes(&area);
        area.reserve(10);

        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);
        assert!(!area.has_changed());
        area.process_sim_data(&chunk(&[5, 6, 7, 8]), seconds(1.), 1);
        assert!(!area.has_changed());
        area.process_sim_data(&chunk(&[9, 10]), seconds(1.), 1);

        assert!(area.has_changed());
        assert_eq!(changes.get(), 1);
        assert_eq!(*area.data(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(area.received_chunks(), 3);
        assert_eq!(area.state(), StreamState::Complete);
    }

    #[test]
    fn last_chunk_is_clipped_to_the_remaining_bytes() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.reserve(6);

        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);
        area.process_sim_data(&chunk(&[5, 6, 0, 0]), seconds(1.), 1);

        assert_eq!(*area.data(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(area.received_bytes(), 6);
    }

    #[test]
    fn short_chunk_appends_what_it_carries() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.reserve(10);

        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);
        area.process_sim_data(&chunk(&[5, 6]), seconds(1.), 1);

        assert_eq!(area.received_bytes(), 6);
        assert_eq!(area.state(), StreamState::Receiving);
        assert!(!area.has_changed());

        area.process_sim_data(&chunk(&[7, 8, 9, 10]), seconds(1.), 1);

        assert_eq!(*area.data(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(area.received_chunks(), 3);
        assert!(area.has_changed());
    }

    #[test]
    fn reserving_nothing_completes_right_away() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        let changes = counting_changes(&area);

        area.reserve(0);

        assert_eq!(area.state(), StreamState::Complete);
        assert!(area.has_changed());
        assert_eq!(changes.get(), 1);
        assert!(area.data().is_empty());

        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);

        assert!(area.data().is_empty());
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn chunk_after_completion_is_ignored() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        let changes = counting_changes(&area);
        area.reserve(4);
        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);

        let (_, logs) =
            capture_logs(|| area.process_sim_data(&chunk(&[9, 9, 9, 9]), seconds(2.), 2));

        assert_eq!(*area.data(), vec![1, 2, 3, 4]);
        assert_eq!(area.received_bytes(), 4);
        assert_eq!(area.received_chunks(), 1);
        assert_eq!(changes.get(), 1);
        assert!(logs.has_warning_containing("Ignoring chunk"));
    }

    #[test]
    fn chunk_before_reservation_is_ignored() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);

        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);

        assert!(area.data().is_empty());
        assert_eq!(area.state(), StreamState::Idle);
    }

    #[test]
    fn reserve_discards_a_partial_transfer() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.reserve(8);
        area.process_sim_data(&chunk(&[1, 2, 3, 4]), seconds(1.), 1);

        area.reserve(4);
        area.process_sim_data(&chunk(&[5, 6, 7, 8]), seconds(2.), 2);

        assert_eq!(*area.data(), vec![5, 6, 7, 8]);
        assert_eq!(area.received_chunks(), 1);
        assert!(area.has_changed());
    }

    #[test]
    fn reserve_clears_the_change() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.reserve(2);
        area.process_sim_data(&chunk(&[1, 2, 0, 0]), seconds(1.), 1);

        area.reserve(2);

        assert!(!area.has_changed());
        assert_eq!(area.received_bytes(), 0);
    }

    #[test]
    fn completion_stamps_the_area() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.reserve(2);

        area.process_sim_data(&chunk(&[1, 2, 0, 0]), seconds(3.), 7);

        assert_eq!(area.managed().tick_stamp(), Some(7));
    }

    #[test]
    fn large_random_content_arrives_intact() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<8192>(&host);
        let mut content = vec![0u8; 50_000];
        rand::thread_rng().fill_bytes(&mut content);
        area.reserve(content.len());

        for part in content.chunks(8192) {
            let mut message = [0u8; 8192];
            message[..part.len()].copy_from_slice(part);
            area.process_sim_data(&chunk(&message), seconds(1.), 1);
        }

        assert_eq!(*area.data(), content);
        assert_eq!(area.received_chunks(), 7);
    }

    #[test]
    fn allocation_uses_the_chunk_size() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);

        area.allocate_client_data_area(false);

        assert_eq!(host.created_client_data(CLIENT_DATA_ID), Some((4, false)));
        assert_eq!(host.client_data_definition_size(DEFINITION_ID), Some(4));
    }

    #[test]
    fn write_sends_chunks_with_the_last_one_padded() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.set_data(vec![1, 2, 3, 4, 5, 6]);

        assert!(area.write_data_to_sim());

        assert_eq!(
            host.client_data_writes(),
            vec![
                (CLIENT_DATA_ID, vec![1, 2, 3, 4]),
                (CLIENT_DATA_ID, vec![5, 6, 0, 0])
            ]
        );
    }

    #[test]
    fn failed_chunk_aborts_the_write() {
        let host = Rc::new(TestSimulatorHost::new());
        let area = area::<4>(&host);
        area.set_data(vec![1; 12]);
        host.fail_after("set_client_data", 1);

        let (written, logs) = capture_logs(|| area.write_data_to_sim());

        assert!(!written);
        assert_eq!(host.client_data_writes().len(), 1);
        assert_eq!(host.call_count("set_client_data"), 2);
        assert!(logs.has_error_containing("Failed to write chunk"));
    }
}
