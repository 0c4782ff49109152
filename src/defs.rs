pub type Number = u8;

pub struct TicketStruct {
    pub rows: u8,
    pub cols: u8,
    pub numbers_per_row: u8,
}

pub const TICKETCONFIG: TicketStruct = TicketStruct {
    rows: 3, // rows in a ticket
    cols: 9, // columns in a ticket, one decade bucket each
    numbers_per_row: 5, // filled cells in every valid row
};

pub const TICKETCELLS: u8 = TICKETCONFIG.rows * TICKETCONFIG.cols;
pub const NUMBERSPERTICKET: u8 = TICKETCONFIG.rows * TICKETCONFIG.numbers_per_row;
pub const TICKETSPERSTRIP: u8 = 6;

pub const FIRSTNUMBER: Number = 1;
pub const LASTNUMBER: Number = TICKETSPERSTRIP * NUMBERSPERTICKET - 1 + FIRSTNUMBER;

// Reserved identity used by the caller when talking to the hub API.
pub const CALLER_ID: &str = "0000000000000000";
