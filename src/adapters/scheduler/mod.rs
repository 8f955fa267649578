pub mod crontab;
